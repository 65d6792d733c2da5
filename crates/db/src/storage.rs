//! PostgreSQL implementations of the core storage traits.
//!
//! Every operation is a single statement, so atomicity comes from
//! PostgreSQL itself. Each call is bounded by the configured operation
//! timeout; an overdue call fails with
//! [`StorageError::DeadlineExceeded`] instead of waiting on the pool or the
//! server indefinitely.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use calendar_core::calendar::TimeWindow;
use calendar_core::error::StorageError;
use calendar_core::event::{DeliveryLogEntry, Event, NotificationMessage};
use calendar_core::storage::{new_event_id, DeliveryLog, EventStorage};
use calendar_core::types::Timestamp;
use chrono::{Utc, Weekday};

use crate::models::event::into_events;
use crate::repositories::{EventRepo, SenderLogRepo};
use crate::DbPool;

/// Run `fut` under `timeout`, mapping sqlx failures and overruns into
/// [`StorageError`].
async fn bounded<T, F>(
    operation: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<T, StorageError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(StorageError::backend),
        Err(_) => {
            tracing::warn!(
                operation,
                timeout_ms = timeout.as_millis() as u64,
                "Storage operation timed out"
            );
            Err(StorageError::DeadlineExceeded { operation, timeout })
        }
    }
}

// ---------------------------------------------------------------------------
// PgStorage
// ---------------------------------------------------------------------------

/// Event store backed by the `events` table.
#[derive(Clone)]
pub struct PgStorage {
    pool: DbPool,
    first_weekday: Weekday,
    timeout: Duration,
}

impl PgStorage {
    pub fn new(pool: DbPool, first_weekday: Weekday, timeout: Duration) -> Self {
        Self {
            pool,
            first_weekday,
            timeout,
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl EventStorage for PgStorage {
    fn first_weekday(&self) -> Weekday {
        self.first_weekday
    }

    async fn add_event(&self, mut event: Event) -> Result<String, StorageError> {
        event.validate(Utc::now())?;
        if event.id.is_empty() {
            event.id = new_event_id();
        }

        let inserted = bounded(
            "add_event",
            self.timeout,
            EventRepo::insert(&self.pool, &event),
        )
        .await?;
        if !inserted {
            return Err(StorageError::DuplicateEventId { id: event.id });
        }
        Ok(event.id)
    }

    async fn update_event(&self, id: &str, event: Event) -> Result<(), StorageError> {
        event.validate(Utc::now())?;

        let found = bounded(
            "update_event",
            self.timeout,
            EventRepo::replace(&self.pool, id, &event),
        )
        .await?;
        if !found {
            return Err(StorageError::NotFoundEvent { id: id.to_string() });
        }
        Ok(())
    }

    async fn remove_event(&self, id: &str) -> Result<(), StorageError> {
        let found = bounded(
            "remove_event",
            self.timeout,
            EventRepo::delete(&self.pool, id),
        )
        .await?;
        if !found {
            return Err(StorageError::NotFoundEvent { id: id.to_string() });
        }
        Ok(())
    }

    async fn get_events_in_range(&self, window: TimeWindow) -> Result<Vec<Event>, StorageError> {
        let rows = bounded(
            "get_events_in_range",
            self.timeout,
            EventRepo::list_starting_between(&self.pool, window.start, window.end),
        )
        .await?;
        into_events(rows)
    }

    async fn get_events_by_notifier(
        &self,
        limit: usize,
        cutoff: Timestamp,
    ) -> Result<Vec<Event>, StorageError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = bounded(
            "get_events_by_notifier",
            self.timeout,
            EventRepo::list_due_for_notification(&self.pool, cutoff, limit),
        )
        .await?;
        into_events(rows)
    }

    async fn mark_sent_events(&self, ids: &[String]) -> Result<(), StorageError> {
        let marked = bounded(
            "mark_sent_events",
            self.timeout,
            EventRepo::mark_sent(&self.pool, ids),
        )
        .await?;
        tracing::debug!(requested = ids.len(), marked, "Marked events as sent");
        Ok(())
    }

    async fn remove_older_than(&self, cutoff: Timestamp) -> Result<u64, StorageError> {
        bounded(
            "remove_older_than",
            self.timeout,
            EventRepo::delete_started_before(&self.pool, cutoff),
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// PgDeliveryLog
// ---------------------------------------------------------------------------

/// Delivery log backed by the `sender_logs` table.
#[derive(Clone)]
pub struct PgDeliveryLog {
    pool: DbPool,
    timeout: Duration,
}

impl PgDeliveryLog {
    pub fn new(pool: DbPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl DeliveryLog for PgDeliveryLog {
    async fn add_sender_log(&self, message: &NotificationMessage) -> Result<(), StorageError> {
        let entry = DeliveryLogEntry::new(message, Utc::now());
        bounded(
            "add_sender_log",
            self.timeout,
            SenderLogRepo::insert(&self.pool, &entry),
        )
        .await
        .map(|_| ())
    }
}
