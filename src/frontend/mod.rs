mod meta;

use axum::{
    body::Body,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio_util::io::ReaderStream;

use crate::{
    db,
    error::ApiError,
    state::AppState,
    tools::{catalog, listing},
};

/// Everything that is not an API route: uploaded files, tool aliases, the
/// built frontend and the SPA shell.
pub async fn handle(State(state): State<AppState>, uri: Uri) -> Result<Response, ApiError> {
    // Decode percent-encoded characters; reject if the path is not valid UTF-8.
    let decoded = percent_decode(uri.path()).ok_or(ApiError::NotFound("Not found"))?;

    if decoded == "/api" || decoded.starts_with("/api/") {
        return Err(ApiError::NotFound("Not found"));
    }

    // Reject path traversal attempts early.
    if decoded.split('/').any(|seg| seg == "..") {
        return Err(ApiError::NotFound("Not found"));
    }

    if let Some(rel) = decoded.strip_prefix("/uploads/") {
        return serve_static(&state.upload_root, &state.upload_root.join(rel)).await;
    }

    if let Some(target) = catalog::redirect_target(&decoded) {
        return Ok(Redirect::permanent(target).into_response());
    }

    let rel = decoded.trim_start_matches('/');
    if !rel.is_empty() {
        let fs_path = state.dist_root.join(rel);
        if tokio::fs::metadata(&fs_path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return serve_static(&state.dist_root, &fs_path).await;
        }
    }

    if catalog::find(&decoded).is_some() {
        let loaded = state.tools.current().await;
        if !listing::is_tool_enabled(&loaded.config, &decoded) {
            tracing::debug!("Tool {} is disabled", decoded);
            return serve_index(&state, StatusCode::NOT_FOUND).await;
        }
    }

    serve_index(&state, StatusCode::OK).await
}

/// The SPA shell with site branding injected into `<head>`.
async fn serve_index(state: &AppState, status: StatusCode) -> Result<Response, ApiError> {
    let index = state.dist_root.join("index.html");
    let raw = match tokio::fs::read_to_string(&index).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Ok((
                StatusCode::NOT_FOUND,
                "Frontend not built. Run pnpm build.",
            )
                .into_response());
        }
        Err(e) => return Err(ApiError::Io(e)),
    };

    let site = db::get_site_config(&state.db).await?;
    Ok((status, Html(meta::inject(&raw, &site))).into_response())
}

async fn serve_static(root: &Path, fs_path: &Path) -> Result<Response, ApiError> {
    let real_path = validate_path(root, fs_path).await?;

    let file = tokio::fs::File::open(&real_path).await.map_err(io_err)?;
    let metadata = file.metadata().await?;
    if !metadata.is_file() {
        return Err(ApiError::NotFound("Not found"));
    }

    let mime: &'static str = mime_guess::from_path(&real_path)
        .first_raw()
        .unwrap_or("application/octet-stream");

    let body = Body::from_stream(ReaderStream::new(file));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime)
        .header(header::CONTENT_LENGTH, metadata.len())
        .body(body)
        .map_err(|e| ApiError::Internal(e.into()))
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Canonicalize `path` (resolving symlinks) and verify it stays within
/// `root`, which must already be canonical.
async fn validate_path(root: &Path, path: &Path) -> Result<PathBuf, ApiError> {
    let canonical = tokio::fs::canonicalize(path).await.map_err(io_err)?;
    if !canonical.starts_with(root) {
        return Err(ApiError::NotFound("Not found"));
    }
    Ok(canonical)
}

/// Map an `io::Error` to `ApiError`, translating `NotFound` appropriately.
fn io_err(e: io::Error) -> ApiError {
    if e.kind() == io::ErrorKind::NotFound {
        ApiError::NotFound("Not found")
    } else {
        ApiError::Io(e)
    }
}

/// Percent-decode a URL path. Returns `None` if the decoded bytes are not
/// valid UTF-8 (which maps to a 404).
fn percent_decode(s: &str) -> Option<String> {
    percent_encoding::percent_decode_str(s)
        .decode_utf8()
        .ok()
        .map(|c| c.into_owned())
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{TestApp, read_body};
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::json;

    const SHELL: &str = "<html><head><title>IT Tools</title></head><body>app</body></html>";

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn with_shell() -> TestApp {
        let app = TestApp::new().await;
        tokio::fs::write(app.dist().join("index.html"), SHELL).await.unwrap();
        app
    }

    #[tokio::test]
    async fn missing_build_reports_not_built() {
        let app = TestApp::new().await;
        let response = app.send(get("/")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(read_body(response).await, b"Frontend not built. Run pnpm build.");
    }

    #[tokio::test]
    async fn unknown_paths_get_the_spa_shell() {
        let app = with_shell().await;
        let response = app.send(get("/some/client/route")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = String::from_utf8(read_body(response).await).unwrap();
        assert!(body.contains("<body>app</body>"));
    }

    #[tokio::test]
    async fn built_assets_are_served_with_mime() {
        let app = with_shell().await;
        tokio::fs::create_dir_all(app.dist().join("assets")).await.unwrap();
        tokio::fs::write(app.dist().join("assets/app.js"), "console.log(1)")
            .await
            .unwrap();

        let response = app.send(get("/assets/app.js")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let ct = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(ct.contains("javascript"), "{ct}");
        assert_eq!(read_body(response).await, b"console.log(1)");
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let app = with_shell().await;
        let response = app.send(get("/uploads/%2e%2e/%2e%2e/secret")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn tool_alias_redirects() {
        let app = with_shell().await;
        let response = app.send(get("/json-viewer")).await;
        assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/json-prettify");
    }

    #[tokio::test]
    async fn disabled_tool_page_is_not_found() {
        let app = with_shell().await;
        let token = app.login().await;
        app.json(
            Method::PUT,
            "/api/tools-config",
            Some(&token),
            Some(json!({ "config": { "tools": [{ "path": "/jwt-parser", "enabled": false }] } })),
        )
        .await;

        let response = app.send(get("/jwt-parser")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.send(get("/url-encoder")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn uploaded_logo_is_served() {
        let app = with_shell().await;
        tokio::fs::write(app.state.upload_root.join("logo.svg"), "<svg/>")
            .await
            .unwrap();

        let response = app.send(get("/uploads/logo.svg?v=123")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
    }

    #[tokio::test]
    async fn shell_carries_site_branding() {
        let app = with_shell().await;
        let token = app.login().await;
        app.json(
            Method::PUT,
            "/api/site-config",
            Some(&token),
            Some(json!({ "config": { "title": "My Tools", "description": "Everything" } })),
        )
        .await;

        let response = app.send(get("/")).await;
        let body = String::from_utf8(read_body(response).await).unwrap();

        assert!(body.contains("<title>My Tools</title>"));
        assert!(body.contains(r#"<meta name="description" content="Everything">"#));
    }
}
