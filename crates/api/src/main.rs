use anyhow::Context;

use calendar_api::config::ServerConfig;
use calendar_api::router::build_app_router;
use calendar_api::state::AppState;
use calendar_core::runtime::{init_tracing, shutdown_signal};
use calendar_db::StorageConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("calendar_api=debug,calendar_db=info,tower_http=debug");

    // --- Configuration ---
    let config = ServerConfig::from_env().context("invalid server configuration")?;
    let storage_config = StorageConfig::from_env().context("invalid storage configuration")?;
    tracing::info!(
        addr = %config.addr(),
        backend = %storage_config.backend,
        "Loaded server configuration"
    );

    // --- Storage ---
    let storage = calendar_db::connect_storage(&storage_config)
        .await
        .context("failed to open event storage")?;

    // --- Router ---
    let addr = config.addr();
    let state = AppState::new(storage.events, storage.pool, config);
    let app = build_app_router(state);

    // --- Start server ---
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    tracing::info!(%addr, "Starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}
