//! Notification sender process.
//!
//! Consumes notification messages from the broker and records each one in
//! the delivery log. Any delivery failure ends the process with a non-zero
//! exit status; the failed message stays queued.

use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use calendar_core::runtime::{init_tracing, shutdown_signal};
use calendar_db::StorageConfig;
use calendar_events::{BrokerConfig, PgBroker, Sender};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("calendar_sender=debug,calendar_events=debug,calendar_db=info");

    // --- Configuration ---
    let storage_config = StorageConfig::from_env().context("invalid storage configuration")?;
    let broker_config = BrokerConfig::from_env().context("invalid broker configuration")?;
    tracing::info!(
        backend = %storage_config.backend,
        queue = %broker_config.queue,
        "Loaded sender configuration"
    );

    // --- Storage and broker ---
    let storage = calendar_db::connect_shared_storage(&storage_config, "calendar-sender")
        .await
        .context("failed to open delivery log")?;
    let broker = Arc::new(
        PgBroker::connect(&broker_config)
            .await
            .context("failed to connect to broker")?,
    );

    let sender = Sender::new(storage.delivery_log);

    // --- Consume until signalled or a delivery fails ---
    let cancel = CancellationToken::new();
    let mut consumer = {
        let cancel = cancel.clone();
        let broker = Arc::clone(&broker);
        tokio::spawn(async move { sender.run(broker.as_ref(), cancel).await })
    };

    tokio::select! {
        joined = &mut consumer => {
            joined
                .context("sender task panicked")?
                .context("notification delivery failed")?;
            tracing::warn!("Sender stopped without a shutdown signal");
        }
        () = shutdown_signal() => {
            cancel.cancel();
            tracing::info!("Waiting for in-flight delivery to finish");
            consumer
                .await
                .context("sender task panicked")?
                .context("notification delivery failed")?;
        }
    }

    tracing::info!("Sender stopped");
    Ok(())
}
