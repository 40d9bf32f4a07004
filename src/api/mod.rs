mod auth;
mod site_config;
mod tools_config;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRequest, Request},
    middleware,
    routing::{get, post, put},
};
use serde::de::DeserializeOwned;

use crate::{auth::require_auth, error::ApiError, state::AppState};

/// Upper bound for JSON bodies and logo uploads.
const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Build the `/api/*` router. Unknown API paths are answered by the
/// application fallback.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/tools", get(tools_config::get_tools))
        .route("/api/tools-config", get(tools_config::get_config))
        .route("/api/site-config", get(site_config::get_config));

    let protected = Router::new()
        .route("/api/auth/change-password", post(auth::change_password))
        .route("/api/tools-config", put(tools_config::put_config))
        .route("/api/site-config", put(site_config::put_config))
        .route("/api/site-config/logo", post(site_config::upload_logo))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
}

/// `Json` whose rejections (bad syntax, wrong content type, wrong shape)
/// become a plain 400.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => {
                tracing::debug!("Rejected JSON body: {}", rejection.body_text());
                Err(ApiError::BadRequest("Invalid request body"))
            }
        }
    }
}
