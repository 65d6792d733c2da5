use std::sync::Arc;

use calendar_core::storage::EventStorage;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    /// Event store selected at startup (memory or PostgreSQL).
    pub storage: Arc<dyn EventStorage>,
    /// PostgreSQL pool when that backend is active; used by `/health`.
    pub pool: Option<calendar_db::DbPool>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn EventStorage>,
        pool: Option<calendar_db::DbPool>,
        config: ServerConfig,
    ) -> Self {
        Self {
            storage,
            pool,
            config: Arc::new(config),
        }
    }
}
