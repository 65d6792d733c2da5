//! Message broker bridge.
//!
//! The scheduler publishes encoded notification messages; the sender
//! consumes them. A [`Broker`] only moves opaque byte payloads, encoding is
//! the caller's concern.

use std::time::Duration;

use async_trait::async_trait;
use calendar_core::config::{env_millis, env_optional, env_or, ConfigError};
use calendar_core::error::BoxError;
use tokio_util::sync::CancellationToken;

pub mod memory;
pub mod postgres;

pub use memory::MemoryBroker;
pub use postgres::PgBroker;

/// Queue used when `BROKER_QUEUE` is unset.
pub const DEFAULT_QUEUE: &str = "notifications";

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Callback invoked once per consumed message.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Process one payload. An error stops the consume loop; durable
    /// backends keep the failed message queued for the next consumer.
    async fn handle(&self, payload: &[u8]) -> Result<(), BoxError>;
}

/// Publish/consume facade over a message queue.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Enqueue `payload`. Success only means the broker accepted the
    /// message, not that anybody received it.
    async fn publish(&self, payload: Vec<u8>) -> Result<(), BrokerError>;

    /// Deliver messages to `handler` one at a time, in enqueue order.
    ///
    /// Returns `Ok(())` once `cancel` fires and
    /// [`BrokerError::Handler`] as soon as the handler fails.
    async fn consume(
        &self,
        handler: &dyn MessageHandler,
        cancel: CancellationToken,
    ) -> Result<(), BrokerError>;
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("failed to connect to broker after {attempts} attempts: {source}")]
    Connect {
        attempts: usize,
        #[source]
        source: BoxError,
    },

    #[error("failed to publish message: {0}")]
    Publish(#[source] BoxError),

    #[error("failed to consume messages: {0}")]
    Consume(#[source] BoxError),

    #[error("message handler failed: {0}")]
    Handler(#[source] BoxError),

    #[error("broker channel is closed")]
    Closed,
}

// ---------------------------------------------------------------------------
// BrokerConfig
// ---------------------------------------------------------------------------

/// Connection settings for [`PgBroker`].
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub url: String,
    pub queue: String,
    /// How long an idle consumer waits before polling the queue again.
    pub poll_interval: Duration,
    pub max_connections: u32,
}

impl BrokerConfig {
    /// Load from environment variables.
    ///
    /// | Env var                   | Default                       |
    /// |---------------------------|-------------------------------|
    /// | `BROKER_URL`              | value of `DATABASE_URL`       |
    /// | `BROKER_QUEUE`            | `notifications`               |
    /// | `BROKER_POLL_INTERVAL_MS` | `1000`                        |
    /// | `BROKER_MAX_CONNECTIONS`  | `5`                           |
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = env_optional("BROKER_URL")
            .or_else(|| env_optional("DATABASE_URL"))
            .ok_or(ConfigError::Missing { key: "BROKER_URL" })?;

        Ok(Self {
            url,
            queue: env_or("BROKER_QUEUE", DEFAULT_QUEUE.to_string())?,
            poll_interval: env_millis("BROKER_POLL_INTERVAL_MS", 1000)?,
            max_connections: env_or("BROKER_MAX_CONNECTIONS", 5)?,
        })
    }
}
