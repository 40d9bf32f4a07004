use sqlx::SqlitePool;
use std::path::PathBuf;

use crate::{auth::Sessions, tools::store::ToolsConfigStore};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub sessions: Sessions,
    pub tools: ToolsConfigStore,
    /// Canonicalized (symlink-resolved) frontend build directory.
    /// May not exist if the frontend was never built.
    pub dist_root: PathBuf,
    /// Canonicalized directory uploaded files are written to and served from.
    pub upload_root: PathBuf,
}
