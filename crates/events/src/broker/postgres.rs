//! Durable broker backed by the `notification_queue` table.
//!
//! Consumers claim the oldest message with `SELECT FOR UPDATE SKIP LOCKED`
//! and run the handler inside the claiming transaction. The row is deleted
//! and the transaction committed only when the handler succeeds, so a
//! failed or interrupted delivery leaves the message queued.

use std::time::Duration;

use async_trait::async_trait;
use calendar_db::repositories::QueueRepo;
use calendar_db::DbPool;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{Broker, BrokerConfig, BrokerError, MessageHandler};

/// Retry delays in seconds for the initial connection (1s, 2s, 4s).
const CONNECT_RETRY_DELAYS: [u64; 3] = [1, 2, 4];

/// How long a single connection attempt may wait for the server.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// PgBroker
// ---------------------------------------------------------------------------

pub struct PgBroker {
    pool: DbPool,
    queue: String,
    poll_interval: Duration,
}

impl PgBroker {
    /// Connect with exponential-backoff retry, then make sure the queue
    /// table exists.
    ///
    /// Gives up after the last retry; callers treat the error as fatal.
    pub async fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let attempts = CONNECT_RETRY_DELAYS.len() + 1;

        for (attempt, delay_secs) in CONNECT_RETRY_DELAYS.iter().enumerate() {
            match Self::try_connect(config).await {
                Ok(pool) => return Self::finish_connect(pool, config).await,
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        retry_in_secs = delay_secs,
                        error = %e,
                        "Broker connection attempt failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
                }
            }
        }

        // Final attempt after the last backoff.
        match Self::try_connect(config).await {
            Ok(pool) => Self::finish_connect(pool, config).await,
            Err(e) => {
                tracing::error!(attempts, error = %e, "Broker connection failed");
                Err(BrokerError::Connect {
                    attempts,
                    source: Box::new(e),
                })
            }
        }
    }

    /// Wrap an existing pool whose migrations have already been applied.
    pub fn from_pool(pool: DbPool, queue: impl Into<String>, poll_interval: Duration) -> Self {
        Self {
            pool,
            queue: queue.into(),
            poll_interval,
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Number of messages waiting in this broker's queue.
    pub async fn depth(&self) -> Result<i64, BrokerError> {
        QueueRepo::depth(&self.pool, &self.queue)
            .await
            .map_err(|e| BrokerError::Consume(Box::new(e)))
    }

    async fn try_connect(config: &BrokerConfig) -> Result<DbPool, sqlx::Error> {
        let pool =
            calendar_db::create_pool(&config.url, config.max_connections, CONNECT_TIMEOUT).await?;
        calendar_db::health_check(&pool).await?;
        Ok(pool)
    }

    async fn finish_connect(pool: DbPool, config: &BrokerConfig) -> Result<Self, BrokerError> {
        calendar_db::run_migrations(&pool)
            .await
            .map_err(|e| BrokerError::Connect {
                attempts: 1,
                source: Box::new(e),
            })?;
        tracing::info!(queue = %config.queue, "Connected to broker");
        Ok(Self::from_pool(pool, config.queue.clone(), config.poll_interval))
    }

    /// Claim and handle at most one message.
    ///
    /// Returns `Ok(true)` when a message was handled and acknowledged,
    /// `Ok(false)` when the queue was empty.
    async fn consume_one(&self, handler: &dyn MessageHandler) -> Result<bool, BrokerError> {
        let consume_err = |e: sqlx::Error| BrokerError::Consume(Box::new(e));

        let mut tx = self.pool.begin().await.map_err(consume_err)?;
        let Some(message) = QueueRepo::claim_next(&mut tx, &self.queue)
            .await
            .map_err(consume_err)?
        else {
            tx.rollback().await.map_err(consume_err)?;
            return Ok(false);
        };

        if let Err(e) = handler.handle(&message.payload).await {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(
                    message_id = message.id,
                    error = %rollback_err,
                    "Failed to release claimed message"
                );
            }
            return Err(BrokerError::Handler(e));
        }

        QueueRepo::delete(&mut tx, message.id)
            .await
            .map_err(consume_err)?;
        tx.commit().await.map_err(consume_err)?;

        tracing::debug!(message_id = message.id, queue = %self.queue, "Message acknowledged");
        Ok(true)
    }
}

#[async_trait]
impl Broker for PgBroker {
    async fn publish(&self, payload: Vec<u8>) -> Result<(), BrokerError> {
        let id = QueueRepo::enqueue(&self.pool, &self.queue, &payload)
            .await
            .map_err(|e| BrokerError::Publish(Box::new(e)))?;
        tracing::debug!(message_id = id, queue = %self.queue, "Message published");
        Ok(())
    }

    async fn consume(
        &self,
        handler: &dyn MessageHandler,
        cancel: CancellationToken,
    ) -> Result<(), BrokerError> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            queue = %self.queue,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Broker consumer started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(queue = %self.queue, "Broker consumer shutting down");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            // Drain everything currently queued before sleeping again.
            while !cancel.is_cancelled() {
                match self.consume_one(handler).await {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(e @ BrokerError::Handler(_)) => return Err(e),
                    Err(e) => {
                        tracing::error!(queue = %self.queue, error = %e, "Consume cycle failed");
                        break;
                    }
                }
            }
        }
    }
}
