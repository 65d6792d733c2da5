//! Notification scheduler.
//!
//! [`NotificationScheduler`] runs as a long-lived task with two tickers:
//! one publishes reminders for events whose notification window has
//! opened, the other sweeps events older than the retention period.
//! Failures are logged and retried on the next tick; they never stop the
//! loop.

use std::sync::Arc;
use std::time::Duration;

use calendar_core::config::{env_or, env_secs, ConfigError};
use calendar_core::error::StorageError;
use calendar_core::event::{Event, NotificationMessage};
use calendar_core::storage::EventStorage;
use calendar_core::types::Timestamp;
use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::broker::{Broker, BrokerError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Period of the notify ticker.
    pub check_interval: Duration,
    /// Period of the retention ticker.
    pub retention_interval: Duration,
    /// Events that started longer ago than this are deleted.
    pub retention: chrono::Duration,
    /// Maximum number of events fetched per batch.
    pub batch_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(60),
            retention_interval: Duration::from_secs(300),
            retention: chrono::Duration::days(365),
            batch_limit: 100,
        }
    }
}

impl SchedulerConfig {
    /// Load from environment variables.
    ///
    /// | Env var                         | Default |
    /// |---------------------------------|---------|
    /// | `NOTIFY_CHECK_INTERVAL_SECS`    | `60`    |
    /// | `RETENTION_CHECK_INTERVAL_SECS` | `300`   |
    /// | `RETENTION_DAYS`                | `365`   |
    /// | `NOTIFY_BATCH_LIMIT`            | `100`   |
    pub fn from_env() -> Result<Self, ConfigError> {
        let check_interval = env_secs("NOTIFY_CHECK_INTERVAL_SECS", 60)?;
        let retention_interval = env_secs("RETENTION_CHECK_INTERVAL_SECS", 300)?;
        let retention_days: u32 = env_or("RETENTION_DAYS", 365)?;
        let batch_limit: usize = env_or("NOTIFY_BATCH_LIMIT", 100)?;

        for (key, interval) in [
            ("NOTIFY_CHECK_INTERVAL_SECS", check_interval),
            ("RETENTION_CHECK_INTERVAL_SECS", retention_interval),
        ] {
            if interval.is_zero() {
                return Err(ConfigError::Invalid {
                    key,
                    value: "0".into(),
                    reason: "interval must be positive".into(),
                });
            }
        }
        if batch_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "NOTIFY_BATCH_LIMIT",
                value: "0".into(),
                reason: "batch limit must be positive".into(),
            });
        }

        Ok(Self {
            check_interval,
            retention_interval,
            retention: chrono::Duration::days(i64::from(retention_days)),
            batch_limit,
        })
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to encode notification for event {id}: {source}")]
    Encode {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to publish notification for event {id}: {source}")]
    Publish {
        id: String,
        #[source]
        source: BrokerError,
    },
}

// ---------------------------------------------------------------------------
// Cutoff tracking
// ---------------------------------------------------------------------------

/// Chooses the cutoff for each notify tick.
///
/// The cutoff never moves backwards, even if the wall clock does, and a
/// tick that failed is retried with the exact same cutoff.
#[derive(Debug, Default)]
struct CutoffTracker {
    committed: Option<Timestamp>,
    pending: Option<Timestamp>,
}

impl CutoffTracker {
    fn next(&mut self, now: Timestamp) -> Timestamp {
        if let Some(pending) = self.pending {
            return pending;
        }
        let cutoff = match self.committed {
            Some(committed) if committed > now => committed,
            _ => now,
        };
        self.pending = Some(cutoff);
        cutoff
    }

    fn commit(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.committed = Some(pending);
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationScheduler
// ---------------------------------------------------------------------------

pub struct NotificationScheduler {
    storage: Arc<dyn EventStorage>,
    broker: Arc<dyn Broker>,
    config: SchedulerConfig,
}

impl NotificationScheduler {
    pub fn new(
        storage: Arc<dyn EventStorage>,
        broker: Arc<dyn Broker>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            storage,
            broker,
            config,
        }
    }

    /// Run both tickers until `cancel` fires.
    ///
    /// Cancellation is observed between ticks and between batches, so a
    /// batch that has been published is always marked sent first.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut notify = tokio::time::interval(self.config.check_interval);
        let mut retention = tokio::time::interval(self.config.retention_interval);
        notify.set_missed_tick_behavior(MissedTickBehavior::Delay);
        retention.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut cutoffs = CutoffTracker::default();

        tracing::info!(
            check_interval_secs = self.config.check_interval.as_secs(),
            retention_interval_secs = self.config.retention_interval.as_secs(),
            retention_days = self.config.retention.num_days(),
            batch_limit = self.config.batch_limit,
            "Notification scheduler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Notification scheduler shutting down");
                    break;
                }
                _ = notify.tick() => {
                    let cutoff = cutoffs.next(Utc::now());
                    match self.dispatch_due(cutoff, &cancel).await {
                        Ok(sent) => {
                            cutoffs.commit();
                            if sent > 0 {
                                tracing::info!(
                                    sent,
                                    cutoff = %cutoff,
                                    "Published event notifications"
                                );
                            }
                        }
                        Err(e) => {
                            tracing::error!(
                                cutoff = %cutoff,
                                error = %e,
                                "Notification cycle failed"
                            );
                        }
                    }
                }
                _ = retention.tick() => {
                    if let Err(e) = self.sweep_expired(Utc::now()).await {
                        tracing::error!(error = %e, "Retention sweep failed");
                    }
                }
            }
        }
    }

    /// Publish every due notification for `cutoff`, batch by batch.
    ///
    /// Returns the number of events published and marked sent. On a
    /// publish failure the events already published are still marked sent
    /// before the error is returned.
    pub async fn dispatch_due(
        &self,
        cutoff: Timestamp,
        cancel: &CancellationToken,
    ) -> Result<usize, SchedulerError> {
        let limit = self.config.batch_limit;
        let mut total = 0;

        loop {
            let batch = self.storage.get_events_by_notifier(limit, cutoff).await?;
            if batch.is_empty() {
                break;
            }

            let (published, failure) = self.publish_batch(&batch).await;
            if !published.is_empty() {
                self.storage.mark_sent_events(&published).await?;
                total += published.len();
            }
            if let Some(e) = failure {
                return Err(e);
            }

            if batch.len() < limit || cancel.is_cancelled() {
                break;
            }
        }

        Ok(total)
    }

    /// Publish `batch` in order, stopping at the first failure. Returns the
    /// ids that were published along with the failure, if any.
    async fn publish_batch(&self, batch: &[Event]) -> (Vec<String>, Option<SchedulerError>) {
        let mut published = Vec::with_capacity(batch.len());

        for event in batch {
            let message = NotificationMessage::from(event);
            let payload = match serde_json::to_vec(&message) {
                Ok(payload) => payload,
                Err(source) => {
                    let id = event.id.clone();
                    return (published, Some(SchedulerError::Encode { id, source }));
                }
            };

            if let Err(source) = self.broker.publish(payload).await {
                let id = event.id.clone();
                return (published, Some(SchedulerError::Publish { id, source }));
            }

            tracing::debug!(
                event_id = %event.id,
                owner_id = %event.owner_id,
                "Notification published"
            );
            published.push(event.id.clone());
        }

        (published, None)
    }

    /// Delete events that started before `now - retention`.
    pub async fn sweep_expired(&self, now: Timestamp) -> Result<u64, SchedulerError> {
        let cutoff = now - self.config.retention;
        let removed = self.storage.remove_older_than(cutoff).await?;
        if removed > 0 {
            tracing::info!(removed, cutoff = %cutoff, "Removed expired events");
        }
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
