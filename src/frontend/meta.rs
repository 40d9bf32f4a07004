//! Site-config driven `<head>` tags for the SPA shell.

use maud::{Markup, html};

use crate::db::SiteConfig;

fn first_non_empty<'a>(candidates: &[&'a String]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .find(|s| !s.trim().is_empty())
        .map(String::as_str)
}

/// Document title: `title - titleDescription`, or just `title`.
pub fn page_title(site: &SiteConfig) -> Option<String> {
    let title = site.title.trim();
    if title.is_empty() {
        return None;
    }
    match site.title_description.trim() {
        "" => Some(title.to_string()),
        desc => Some(format!("{title} - {desc}")),
    }
}

/// Meta and link tags for search engines and link previews. Social fields
/// fall back to the plain branding fields when unset.
pub fn head_tags(site: &SiteConfig) -> Markup {
    let og_title = first_non_empty(&[&site.og_title, &site.title]);
    let og_description = first_non_empty(&[&site.og_description, &site.description]);
    let og_url = first_non_empty(&[&site.og_url, &site.canonical_url]);
    let og_image = first_non_empty(&[&site.og_image_url]);
    let twitter_title = first_non_empty(&[&site.twitter_title, &site.og_title, &site.title]);
    let twitter_description =
        first_non_empty(&[&site.twitter_description, &site.og_description, &site.description]);
    let twitter_image = first_non_empty(&[&site.twitter_image_url, &site.og_image_url]);

    html! {
        @if let Some(desc) = first_non_empty(&[&site.description]) {
            meta name="description" content=(desc);
        }
        @if let Some(url) = first_non_empty(&[&site.canonical_url]) {
            link rel="canonical" href=(url);
        }
        @if let Some(v) = og_title { meta property="og:title" content=(v); }
        @if let Some(v) = og_description { meta property="og:description" content=(v); }
        @if let Some(v) = og_url { meta property="og:url" content=(v); }
        @if let Some(v) = og_image { meta property="og:image" content=(v); }
        @if let Some(v) = twitter_title { meta name="twitter:title" content=(v); }
        @if let Some(v) = twitter_description { meta name="twitter:description" content=(v); }
        @if let Some(v) = twitter_image {
            meta name="twitter:card" content="summary_large_image";
            meta name="twitter:image" content=(v);
        }
    }
}

/// Rewrite the built `index.html` with the site's title and head tags.
/// Documents without `</head>` are returned with only the title changed.
pub fn inject(index_html: &str, site: &SiteConfig) -> String {
    let mut out = index_html.to_string();

    if let Some(title) = page_title(site) {
        if let (Some(start), Some(end)) = (out.find("<title>"), out.find("</title>")) {
            if start < end {
                let rendered = html! { title { (title) } }.into_string();
                out.replace_range(start..end + "</title>".len(), &rendered);
            }
        }
    }

    let tags = head_tags(site).into_string();
    if !tags.is_empty() {
        if let Some(pos) = out.find("</head>") {
            out.insert_str(pos, &tags);
        }
    }

    out
}
