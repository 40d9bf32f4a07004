//! Loads the persisted tools config, sharing one in-flight load between
//! concurrent callers.

use futures::future::{BoxFuture, FutureExt, Shared};
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex};

use super::config::{ToolsConfig, normalize};

/// Source of the persisted (possibly partial) config.
pub type Loader = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<Option<ToolsConfig>>> + Send + Sync>;

/// Result of one load. On failure `config` is the defaults and `error` holds
/// the reason.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Arc<ToolsConfig>,
    pub error: Option<String>,
}

type InFlight = Shared<BoxFuture<'static, LoadedConfig>>;

#[derive(Clone)]
pub struct ToolsConfigStore {
    defaults: Arc<ToolsConfig>,
    loader: Loader,
    in_flight: Arc<Mutex<Option<InFlight>>>,
}

impl ToolsConfigStore {
    pub fn new(defaults: ToolsConfig, loader: Loader) -> Self {
        Self {
            defaults: Arc::new(defaults),
            loader,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Store backed by the `tools_config` row.
    pub fn from_db(pool: SqlitePool) -> Self {
        let loader: Loader = Arc::new(move || {
            let pool = pool.clone();
            async move { crate::db::get_tools_config(&pool).await }.boxed()
        });
        Self::new(ToolsConfig::defaults(), loader)
    }

    pub fn defaults(&self) -> &ToolsConfig {
        &self.defaults
    }

    /// Current normalized config. Callers arriving while a load is running
    /// await that load instead of starting another. Nothing is cached once
    /// the load completes.
    pub async fn current(&self) -> LoadedConfig {
        let fut = {
            let mut slot = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            match slot.as_ref() {
                Some(fut) => fut.clone(),
                None => {
                    let fut = self.load().shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };
        fut.await
    }

    fn load(&self) -> BoxFuture<'static, LoadedConfig> {
        let defaults = Arc::clone(&self.defaults);
        let loader = Arc::clone(&self.loader);
        let in_flight = Arc::clone(&self.in_flight);

        async move {
            let loaded = match loader().await {
                Ok(remote) => LoadedConfig {
                    config: Arc::new(normalize(remote, &defaults)),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!("Failed to load tools config, using defaults: {:#}", e);
                    LoadedConfig {
                        config: defaults,
                        error: Some(e.to_string()),
                    }
                }
            };

            in_flight.lock().unwrap_or_else(|e| e.into_inner()).take();
            loaded
        }
        .boxed()
    }
}
