use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::JsonBody;
use crate::{
    db,
    error::{ApiError, ApiResult},
    state::AppState,
    tools::{
        config::ToolsConfig,
        listing::{self, CategoryGroup},
    },
};

/// The stored override exactly as written, or `null` before the first save.
pub async fn get_config(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let config = db::get_tools_config_raw(&state.db).await?;
    Ok(Json(json!({ "config": config })))
}

/// Replace the stored override wholesale. Concurrent writers are last-write-wins.
pub async fn put_config(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Json<Value>> {
    let Some(config) = body.get("config").filter(|c| c.is_object()) else {
        return Err(ApiError::BadRequest("Invalid config"));
    };
    // Anything stored here must load later, or the listing falls back to defaults.
    if let Err(e) = ToolsConfig::deserialize(config) {
        tracing::debug!("Rejected tools config: {}", e);
        return Err(ApiError::BadRequest("Invalid config"));
    }

    db::put_tools_config(&state.db, config).await?;
    tracing::info!("Tools config updated");

    Ok(Json(json!({ "ok": true })))
}

#[derive(Serialize)]
pub struct ToolsListing {
    categories: Vec<CategoryGroup>,
    error: Option<String>,
}

/// Visible tools grouped and ordered for display.
pub async fn get_tools(State(state): State<AppState>) -> Json<ToolsListing> {
    let loaded = state.tools.current().await;
    let categories = listing::resolve(&loaded.config, state.tools.defaults());
    Json(ToolsListing {
        categories,
        error: loaded.error,
    })
}
