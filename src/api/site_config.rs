use axum::{
    Json,
    extract::{Multipart, State},
};
use serde::Serialize;
use serde_json::{Map, Value, json};

use super::JsonBody;
use crate::{
    db::{self, SiteConfig},
    error::{ApiError, ApiResult},
    state::AppState,
};

/// Multipart field carrying the logo.
const LOGO_FIELD: &str = "logo";

/// Accepted logo MIME types and the extension they are stored under.
const LOGO_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/webp", "webp"),
    ("image/svg+xml", "svg"),
];

/// Public subset of the site config.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteBranding {
    title: String,
    title_description: String,
    description: String,
    logo_url: String,
    canonical_url: String,
}

impl From<SiteConfig> for SiteBranding {
    fn from(c: SiteConfig) -> Self {
        Self {
            title: c.title,
            title_description: c.title_description,
            description: c.description,
            logo_url: c.logo_url,
            canonical_url: c.canonical_url,
        }
    }
}

pub async fn get_config(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let config = SiteBranding::from(db::get_site_config(&state.db).await?);
    Ok(Json(json!({ "config": config })))
}

/// Overwrite the branding fields. Open Graph / Twitter fields are only
/// touched when the request names them.
pub async fn put_config(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Json<Value>> {
    let Some(input) = body.get("config").and_then(Value::as_object) else {
        return Err(ApiError::BadRequest("Invalid config"));
    };

    let title = text_field(input, "title");
    if title.is_empty() {
        return Err(ApiError::BadRequest("Title required"));
    }

    let mut config = db::get_site_config(&state.db).await?;
    config.title = title;
    config.title_description = text_field(input, "titleDescription");
    config.description = text_field(input, "description");
    config.logo_url = text_field(input, "logoUrl");
    config.canonical_url = text_field(input, "canonicalUrl");

    for (key, slot) in [
        ("ogTitle", &mut config.og_title),
        ("ogDescription", &mut config.og_description),
        ("ogImageUrl", &mut config.og_image_url),
        ("ogUrl", &mut config.og_url),
        ("twitterTitle", &mut config.twitter_title),
        ("twitterDescription", &mut config.twitter_description),
        ("twitterImageUrl", &mut config.twitter_image_url),
    ] {
        if input.contains_key(key) {
            *slot = text_field(input, key);
        }
    }

    db::put_site_config(&state.db, &config).await?;
    tracing::info!(title = %config.title, "Site config updated");

    Ok(Json(json!({ "ok": true })))
}

/// Read a field as trimmed text. Missing and `null` become empty; numbers
/// and booleans are stringified.
fn text_field(input: &Map<String, Value>, key: &str) -> String {
    match input.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string().trim().to_string(),
    }
}

struct UploadedFile {
    content_type: Option<String>,
    file_name: Option<String>,
    bytes: axum::body::Bytes,
}

pub async fn upload_logo(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Json<Value>> {
    let mut logo: Option<UploadedFile> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Malformed logo upload: {}", e);
                return Err(ApiError::BadRequest("Upload failed"));
            }
        };
        if field.name() != Some(LOGO_FIELD) {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| {
            tracing::warn!("Failed to read logo upload: {}", e);
            ApiError::BadRequest("Upload failed")
        })?;
        logo = Some(UploadedFile {
            content_type,
            file_name,
            bytes,
        });
        break;
    }

    let Some(logo) = logo else {
        return Err(ApiError::BadRequest("Missing file"));
    };

    let mime = detect_mime(&logo);
    let Some(ext) = LOGO_TYPES
        .iter()
        .find(|(allowed, _)| Some(*allowed) == mime.as_deref())
        .map(|(_, ext)| *ext)
    else {
        tracing::warn!(mime = ?mime, "Rejected logo upload");
        return Err(ApiError::BadRequest("Invalid file type"));
    };

    let file_name = format!("logo.{ext}");
    tokio::fs::write(state.upload_root.join(&file_name), &logo.bytes)
        .await
        .map_err(ApiError::Upload)?;

    let logo_url = format!("/uploads/{}?v={}", file_name, chrono::Utc::now().timestamp());
    db::set_logo_url(&state.db, &logo_url).await?;
    tracing::info!(logo_url = %logo_url, bytes = logo.bytes.len(), "Logo uploaded");

    Ok(Json(json!({ "logoUrl": logo_url })))
}

/// MIME type of an upload. Known image signatures in the content win over
/// whatever the client declared; the declared type and then the file name
/// are used only when the content is not recognized.
fn detect_mime(file: &UploadedFile) -> Option<String> {
    if let Some(sniffed) = sniff_image(&file.bytes) {
        return Some(sniffed.to_string());
    }

    let declared = file
        .content_type
        .as_deref()
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

    declared.or_else(|| {
        file.file_name
            .as_deref()
            .and_then(|name| mime_guess::from_path(name).first_raw())
            .map(str::to_string)
    })
}

fn sniff_image(bytes: &[u8]) -> Option<&'static str> {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";
    if bytes.starts_with(PNG) {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }

    let head = &bytes[..bytes.len().min(512)];
    let text = String::from_utf8_lossy(head);
    let text = text.trim_start_matches('\u{feff}').trim_start();
    if text.starts_with("<svg") || (text.starts_with("<?xml") && text.contains("<svg")) {
        return Some("image/svg+xml");
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{TestApp, read_json};
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };

    const BOUNDARY: &str = "----it-tools-boundary";

    fn multipart_request(
        token: &str,
        field: &str,
        file_name: &str,
        content_type: &str,
        content: &[u8],
    ) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/api/site-config/logo")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn png_bytes() -> Vec<u8> {
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.extend_from_slice(&[0, 0, 0, 13, b'I', b'H', b'D', b'R']);
        bytes
    }

    #[tokio::test]
    async fn site_config_starts_empty() {
        let app = TestApp::new().await;
        let (status, body) = app.json(Method::GET, "/api/site-config", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "config": {
                "title": "", "titleDescription": "", "description": "",
                "logoUrl": "", "canonicalUrl": ""
            }})
        );
    }

    #[tokio::test]
    async fn empty_title_is_rejected() {
        let app = TestApp::new().await;
        let token = app.login().await;

        for title in [json!(""), json!("   "), Value::Null] {
            let (status, body) = app
                .json(
                    Method::PUT,
                    "/api/site-config",
                    Some(&token),
                    Some(json!({ "config": { "title": title } })),
                )
                .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({ "error": "Title required" }));
        }
    }

    #[tokio::test]
    async fn put_without_config_object_is_rejected() {
        let app = TestApp::new().await;
        let token = app.login().await;
        let (status, body) = app
            .json(Method::PUT, "/api/site-config", Some(&token), Some(json!({ "title": "X" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid config" }));
    }

    #[tokio::test]
    async fn put_then_get_returns_trimmed_fields() {
        let app = TestApp::new().await;
        let token = app.login().await;

        let (status, body) = app
            .json(
                Method::PUT,
                "/api/site-config",
                Some(&token),
                Some(json!({ "config": {
                    "title": "  X  ",
                    "description": "Handy tools",
                    "canonicalUrl": "https://tools.example.com"
                }})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));

        let (_, body) = app.json(Method::GET, "/api/site-config", None, None).await;
        assert_eq!(
            body["config"],
            json!({
                "title": "X", "titleDescription": "", "description": "Handy tools",
                "logoUrl": "", "canonicalUrl": "https://tools.example.com"
            })
        );
    }

    #[tokio::test]
    async fn social_fields_survive_unrelated_updates() {
        let app = TestApp::new().await;
        let token = app.login().await;

        app.json(
            Method::PUT,
            "/api/site-config",
            Some(&token),
            Some(json!({ "config": { "title": "A", "ogTitle": "Share me" } })),
        )
        .await;
        app.json(
            Method::PUT,
            "/api/site-config",
            Some(&token),
            Some(json!({ "config": { "title": "B" } })),
        )
        .await;

        let stored = db::get_site_config(&app.state.db).await.unwrap();
        assert_eq!(stored.title, "B");
        assert_eq!(stored.og_title, "Share me");
    }

    #[tokio::test]
    async fn gif_logo_is_rejected() {
        let app = TestApp::new().await;
        let token = app.login().await;

        let req = multipart_request(&token, "logo", "logo.gif", "image/gif", b"GIF89a\x01\x00\x01\x00");
        let response = app.send(req).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await, json!({ "error": "Invalid file type" }));
    }

    #[tokio::test]
    async fn gif_bytes_declared_as_png_are_rejected() {
        let app = TestApp::new().await;
        let token = app.login().await;

        let req = multipart_request(&token, "logo", "logo.png", "image/png", b"GIF89a\x01\x00\x01\x00");
        let response = app.send(req).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn png_logo_is_stored_and_linked() {
        let app = TestApp::new().await;
        let token = app.login().await;

        let req = multipart_request(&token, "logo", "brand.png", "image/png", &png_bytes());
        let response = app.send(req).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = read_json(response).await;
        let logo_url = body["logoUrl"].as_str().unwrap();
        let version = logo_url.strip_prefix("/uploads/logo.png?v=").unwrap();
        assert!(version.parse::<i64>().is_ok());

        let stored = tokio::fs::read(app.state.upload_root.join("logo.png")).await.unwrap();
        assert_eq!(stored, png_bytes());

        let (_, site) = app.json(Method::GET, "/api/site-config", None, None).await;
        assert_eq!(site["config"]["logoUrl"], json!(logo_url));
    }

    #[tokio::test]
    async fn failed_logo_write_is_a_server_error() {
        let mut app = TestApp::new().await;
        let token = app.login().await;
        app.state.upload_root = app.state.dist_root.join("missing/uploads");

        let req = multipart_request(&token, "logo", "logo.png", "image/png", &png_bytes());
        let response = app.send(req).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(read_json(response).await, json!({ "error": "Upload failed" }));

        let (_, site) = app.json(Method::GET, "/api/site-config", None, None).await;
        assert_eq!(site["config"]["logoUrl"], json!(""));
    }

    #[tokio::test]
    async fn missing_logo_field_is_rejected() {
        let app = TestApp::new().await;
        let token = app.login().await;

        let req = multipart_request(&token, "avatar", "logo.png", "image/png", &png_bytes());
        let response = app.send(req).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(response).await, json!({ "error": "Missing file" }));
    }

    #[test]
    fn svg_is_detected_from_content() {
        let file = UploadedFile {
            content_type: None,
            file_name: None,
            bytes: axum::body::Bytes::from_static(b"<?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\"/>"),
        };
        assert_eq!(detect_mime(&file).as_deref(), Some("image/svg+xml"));
    }

    #[test]
    fn file_name_is_the_last_resort() {
        let file = UploadedFile {
            content_type: Some("application/octet-stream".into()),
            file_name: Some("logo.webp".into()),
            bytes: axum::body::Bytes::from_static(b"????"),
        };
        assert_eq!(detect_mime(&file).as_deref(), Some("image/webp"));
    }
}
