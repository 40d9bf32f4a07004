//! Compiled-in tool metadata. The tools themselves run in the browser; the
//! server only needs to know which paths exist, how they are grouped, and
//! which legacy paths redirect to them.

/// One browser utility exposed as a routed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDescriptor {
    /// Route path, unique across the catalog (e.g. `/base64-string-converter`).
    pub path: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub keywords: &'static [&'static str],
    /// Old paths that redirect to `path`.
    pub redirect_from: &'static [&'static str],
    pub is_new: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct CategoryDescriptor {
    pub name: &'static str,
    pub tools: &'static [ToolDescriptor],
}

/// A descriptor paired with the name of the category it is compiled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogTool {
    pub category: &'static str,
    pub tool: &'static ToolDescriptor,
}

const fn tool(
    path: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    keywords: &'static [&'static str],
) -> ToolDescriptor {
    ToolDescriptor {
        path,
        name,
        description,
        icon,
        keywords,
        redirect_from: &[],
        is_new: false,
    }
}

static CATEGORIES: &[CategoryDescriptor] = &[
    CategoryDescriptor {
        name: "Crypto",
        tools: &[
            tool(
                "/token-generator",
                "Token generator",
                "Generate random strings with the chars you want.",
                "ArrowsShuffle",
                &["token", "random", "string", "password"],
            ),
            ToolDescriptor {
                redirect_from: &["/hash"],
                ..tool(
                    "/hash-text",
                    "Hash text",
                    "Hash a text string using MD5, SHA1, SHA256 and more.",
                    "EyeOff",
                    &["hash", "digest", "md5", "sha1", "sha256"],
                )
            },
            tool(
                "/uuid-generator",
                "UUIDs generator",
                "Generate random UUIDs (version 4) in bulk.",
                "Fingerprint",
                &["uuid", "v4", "random", "id"],
            ),
        ],
    },
    CategoryDescriptor {
        name: "Converter",
        tools: &[
            tool(
                "/base64-string-converter",
                "Base64 string encoder/decoder",
                "Encode and decode strings to and from their base64 representation.",
                "FileDigit",
                &["base64", "converter", "encode", "decode"],
            ),
            ToolDescriptor {
                is_new: true,
                ..tool(
                    "/encoding-conversion",
                    "Encoding conversion",
                    "Convert text between URL, base64, GBK, GB2312, UCS-2 and MD5 representations.",
                    "Code",
                    &["encoding", "conversion", "url", "base64", "md5", "gbk", "gb2312", "utf8"],
                )
            },
            tool(
                "/text-to-unicode",
                "Text to Unicode",
                "Parse and convert text to unicode and vice-versa.",
                "TextWrap",
                &["text", "unicode", "escape"],
            ),
        ],
    },
    CategoryDescriptor {
        name: "Web",
        tools: &[
            tool(
                "/url-encoder",
                "Encode/decode URL-formatted strings",
                "Encode to URL-encoded format (also known as \"percent-encoded\") or decode from it.",
                "Link",
                &["url", "encode", "decode", "percent"],
            ),
            ToolDescriptor {
                redirect_from: &["/og-meta-generator"],
                ..tool(
                    "/meta-tag-generator",
                    "Open graph meta generator",
                    "Generate open-graph and socials HTML meta tags for your website.",
                    "Tags",
                    &["meta", "tag", "generator", "social", "open graph", "twitter"],
                )
            },
            tool(
                "/jwt-parser",
                "JWT parser",
                "Parse and decode your JSON Web Token and display its content.",
                "Key",
                &["jwt", "parser", "decode", "token"],
            ),
        ],
    },
    CategoryDescriptor {
        name: "Development",
        tools: &[
            ToolDescriptor {
                redirect_from: &["/json-viewer"],
                ..tool(
                    "/json-prettify",
                    "JSON prettify and format",
                    "Prettify your JSON string into a friendly, human-readable format.",
                    "Braces",
                    &["json", "viewer", "prettify", "format"],
                )
            },
            tool(
                "/crontab-generator",
                "Crontab generator",
                "Validate and generate crontab and get the human-readable description of the cron schedule.",
                "Alarm",
                &["crontab", "generator", "cronjob", "cron", "schedule"],
            ),
        ],
    },
    CategoryDescriptor {
        name: "Data",
        tools: &[
            tool(
                "/iban-validator-and-parser",
                "IBAN validator and parser",
                "Validate and parse IBAN numbers. Check if an IBAN is valid and get the country, BBAN, if it is a QR-IBAN and the IBAN friendly format.",
                "Bank",
                &["iban", "validator", "parser", "bank", "account", "bban"],
            ),
            tool(
                "/phone-parser-and-formatter",
                "Phone parser and formatter",
                "Parse, validate and format phone numbers. Get information about the phone number, like the country code, type, etc.",
                "Phone",
                &["phone", "parser", "formatter", "international"],
            ),
        ],
    },
];

pub fn categories() -> &'static [CategoryDescriptor] {
    CATEGORIES
}

/// All tools in build order, each tagged with its category.
pub fn tools() -> impl Iterator<Item = CatalogTool> {
    CATEGORIES.iter().flat_map(|category| {
        category.tools.iter().map(move |tool| CatalogTool {
            category: category.name,
            tool,
        })
    })
}

pub fn find(path: &str) -> Option<CatalogTool> {
    tools().find(|t| t.tool.path == path)
}

/// Resolve a legacy alias to the canonical tool path.
pub fn redirect_target(alias: &str) -> Option<&'static str> {
    tools()
        .find(|t| t.tool.redirect_from.contains(&alias))
        .map(|t| t.tool.path)
}
