//! Notification scheduler process.
//!
//! Publishes reminders for due events to the broker and sweeps expired
//! events until SIGINT/SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use calendar_core::runtime::{init_tracing, shutdown_signal};
use calendar_db::StorageConfig;
use calendar_events::{BrokerConfig, NotificationScheduler, PgBroker, SchedulerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("calendar_scheduler=debug,calendar_events=debug,calendar_db=info");

    // --- Configuration ---
    let storage_config = StorageConfig::from_env().context("invalid storage configuration")?;
    let broker_config = BrokerConfig::from_env().context("invalid broker configuration")?;
    let scheduler_config = SchedulerConfig::from_env().context("invalid scheduler configuration")?;
    tracing::info!(
        backend = %storage_config.backend,
        queue = %broker_config.queue,
        "Loaded scheduler configuration"
    );

    // --- Storage and broker ---
    let storage = calendar_db::connect_shared_storage(&storage_config, "calendar-scheduler")
        .await
        .context("failed to open event storage")?;
    let broker = PgBroker::connect(&broker_config)
        .await
        .context("failed to connect to broker")?;

    let scheduler = NotificationScheduler::new(storage.events, Arc::new(broker), scheduler_config);

    // --- Run until signalled ---
    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { scheduler.run(cancel).await })
    };

    shutdown_signal().await;
    cancel.cancel();

    // The scheduler stops at the next batch boundary, so a published batch
    // is always marked sent before the process exits.
    tracing::info!("Waiting for the current notify cycle to finish");
    handle.await.context("scheduler task panicked")?;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}
