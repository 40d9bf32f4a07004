use axum::{Extension, Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};

use super::JsonBody;
use crate::{
    auth::AuthedAdmin,
    db,
    error::{ApiError, ApiResult},
    state::AppState,
};

#[derive(Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordBody {
    #[serde(default)]
    old_password: Option<String>,
    #[serde(default)]
    new_password: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginBody>,
) -> ApiResult<Json<Value>> {
    let (Some(username), Some(password)) = (non_empty(body.username), non_empty(body.password))
    else {
        return Err(ApiError::BadRequest("Missing credentials"));
    };

    let admin = db::find_admin_by_username(&state.db, &username)
        .await?
        .filter(|admin| db::verify_password(&admin.password_hash, &password));

    let Some(admin) = admin else {
        tracing::warn!(username = %username, "Failed admin login");
        return Err(ApiError::InvalidCredentials);
    };

    let token = state.sessions.issue(&state, &admin).await?;
    tracing::info!(username = %admin.username, "Admin logged in");

    Ok(Json(json!({ "token": token })))
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(authed): Extension<AuthedAdmin>,
    JsonBody(body): JsonBody<ChangePasswordBody>,
) -> ApiResult<Json<Value>> {
    let (Some(old_password), Some(new_password)) =
        (non_empty(body.old_password), non_empty(body.new_password))
    else {
        return Err(ApiError::BadRequest("Missing credentials"));
    };

    let Some(admin) = db::find_admin_by_id(&state.db, authed.id).await? else {
        return Err(ApiError::NotFound("User not found"));
    };

    if !db::verify_password(&admin.password_hash, &old_password) {
        tracing::warn!(username = %admin.username, "Password change with wrong old password");
        return Err(ApiError::InvalidCredentials);
    }

    db::set_admin_password(&state.db, admin.id, &new_password).await?;
    tracing::info!(username = %admin.username, "Admin password changed");

    Ok(Json(json!({ "ok": true })))
}

#[cfg(test)]
mod tests {
    use crate::{
        api::tests::TestApp,
        auth::{SignedTokens, Sessions},
        db,
    };
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn login_with_correct_credentials_returns_token() {
        let app = TestApp::new().await;
        let token = app.login().await;
        assert_eq!(token.len(), 64);
    }

    #[tokio::test]
    async fn login_failures() {
        let app = TestApp::new().await;

        let cases = [
            (json!({ "username": "admin", "password": "wrong" }), StatusCode::UNAUTHORIZED, "Invalid credentials"),
            (json!({ "username": "nobody", "password": "admin123" }), StatusCode::UNAUTHORIZED, "Invalid credentials"),
            (json!({ "username": "admin" }), StatusCode::BAD_REQUEST, "Missing credentials"),
            (json!({ "username": "", "password": "admin123" }), StatusCode::BAD_REQUEST, "Missing credentials"),
            (json!({}), StatusCode::BAD_REQUEST, "Missing credentials"),
        ];

        for (body, status, error) in cases {
            let (got_status, got_body) = app
                .json(Method::POST, "/api/auth/login", None, Some(body.clone()))
                .await;
            assert_eq!(got_status, status, "{body}");
            assert_eq!(got_body, json!({ "error": error }), "{body}");
        }
    }

    #[tokio::test]
    async fn change_password_with_wrong_old_password_keeps_hash() {
        let app = TestApp::new().await;
        let token = app.login().await;
        let before = db::find_admin_by_username(&app.state.db, "admin").await.unwrap().unwrap();

        let (status, body) = app
            .json(
                Method::POST,
                "/api/auth/change-password",
                Some(&token),
                Some(json!({ "oldPassword": "nope", "newPassword": "fresh-secret" })),
            )
            .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "Invalid credentials" }));
        let after = db::find_admin_by_username(&app.state.db, "admin").await.unwrap().unwrap();
        assert_eq!(before.password_hash, after.password_hash);
    }

    #[tokio::test]
    async fn change_password_then_login_with_new_password() {
        let app = TestApp::new().await;
        let token = app.login().await;

        let (status, body) = app
            .json(
                Method::POST,
                "/api/auth/change-password",
                Some(&token),
                Some(json!({ "oldPassword": "admin123", "newPassword": "fresh-secret" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true }));

        let (old, _) = app
            .json(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": "admin", "password": "admin123" })),
            )
            .await;
        assert_eq!(old, StatusCode::UNAUTHORIZED);

        let (new, body) = app
            .json(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": "admin", "password": "fresh-secret" })),
            )
            .await;
        assert_eq!(new, StatusCode::OK);
        assert!(body["token"].is_string());
    }

    #[tokio::test]
    async fn change_password_requires_both_fields() {
        let app = TestApp::new().await;
        let token = app.login().await;

        let (status, _) = app
            .json(
                Method::POST,
                "/api/auth/change-password",
                Some(&token),
                Some(json!({ "oldPassword": "admin123" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn change_password_for_deleted_admin_is_not_found() {
        let app = TestApp::new().await;
        let token = app.login().await;
        sqlx::query("DELETE FROM admins").execute(&app.state.db).await.unwrap();

        let (status, body) = app
            .json(
                Method::POST,
                "/api/auth/change-password",
                Some(&token),
                Some(json!({ "oldPassword": "admin123", "newPassword": "x" })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "User not found" }));
    }

    #[tokio::test]
    async fn expired_stored_session_is_unauthorized() {
        let app = TestApp::new().await;
        db::insert_session(&app.state.db, "stale-token", 1, 0).await.unwrap();

        let (status, _) = app
            .json(
                Method::PUT,
                "/api/tools-config",
                Some("stale-token"),
                Some(json!({ "config": {} })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(db::find_session(&app.state.db, "stale-token").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn signed_mode_issues_jwt() {
        let app = TestApp::with_sessions(Sessions::Signed(SignedTokens::new(
            "test-secret",
            chrono::Duration::hours(12),
        )))
        .await;
        let token = app.login().await;
        assert_eq!(token.split('.').count(), 3);

        let (status, _) = app
            .json(
                Method::PUT,
                "/api/tools-config",
                Some(&token),
                Some(json!({ "config": { "version": 1 } })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .json(
                Method::PUT,
                "/api/tools-config",
                Some("forged.token.value"),
                Some(json!({ "config": { "version": 1 } })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
