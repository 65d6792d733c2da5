//! Storage capability traits.
//!
//! [`EventStorage`] is the seam between callers (HTTP handlers, the
//! notification scheduler) and a concrete backend. Calendar window
//! arithmetic and anchor validation live in the provided methods, so every
//! backend only answers plain `[start, end)` range queries and shares the
//! exact same day/week/month semantics.
//!
//! [`DeliveryLog`] is the sender's append-only audit log. It is deliberately
//! a separate trait: the sender never touches the event table.

use async_trait::async_trait;
use chrono::Weekday;

use crate::calendar::{self, TimeWindow};
use crate::error::StorageError;
use crate::event::{Event, NotificationMessage};
use crate::types::{Anchor, Timestamp};

pub mod memory;

#[cfg(any(test, feature = "test-support"))]
pub mod conformance;

pub use memory::{MemoryDeliveryLog, MemoryStorage};

/// Event repository shared by the HTTP service and the scheduler.
///
/// Implementations must be safe for concurrent use. Mutations are atomic
/// with respect to every other operation; callers always receive owned
/// copies of stored events.
#[async_trait]
pub trait EventStorage: Send + Sync {
    /// Weekday that `get_events_for_week` anchors must fall on.
    fn first_weekday(&self) -> Weekday;

    /// Validate and insert `event`, assigning an id when it is empty.
    /// Returns the stored id.
    async fn add_event(&self, event: Event) -> Result<String, StorageError>;

    /// Replace every field of the event stored under `id`. The stored id is
    /// kept regardless of `event.id`.
    async fn update_event(&self, id: &str, event: Event) -> Result<(), StorageError>;

    async fn remove_event(&self, id: &str) -> Result<(), StorageError>;

    /// Events whose start falls inside `window`, ordered by `(start_time, id)`.
    async fn get_events_in_range(&self, window: TimeWindow) -> Result<Vec<Event>, StorageError>;

    /// Up to `limit` unsent events whose notification window opened before
    /// `cutoff`, ordered by `(start_time, id)`.
    async fn get_events_by_notifier(
        &self,
        limit: usize,
        cutoff: Timestamp,
    ) -> Result<Vec<Event>, StorageError>;

    /// Flag exactly the events listed in `ids` as sent. Unknown ids are
    /// ignored.
    async fn mark_sent_events(&self, ids: &[String]) -> Result<(), StorageError>;

    /// Retention sweep: delete events that started before `cutoff`.
    /// Returns the number of removed events.
    async fn remove_older_than(&self, cutoff: Timestamp) -> Result<u64, StorageError>;

    async fn get_events_for_day(&self, date: Anchor) -> Result<Vec<Event>, StorageError> {
        let window = calendar::day_window(date)?;
        self.get_events_in_range(window).await
    }

    async fn get_events_for_week(&self, date: Anchor) -> Result<Vec<Event>, StorageError> {
        let window = calendar::week_window(date, self.first_weekday())?;
        self.get_events_in_range(window).await
    }

    async fn get_events_for_month(&self, date: Anchor) -> Result<Vec<Event>, StorageError> {
        let window = calendar::month_window(date)?;
        self.get_events_in_range(window).await
    }
}

/// Append-only record of notifications received by the sender.
#[async_trait]
pub trait DeliveryLog: Send + Sync {
    async fn add_sender_log(&self, message: &NotificationMessage) -> Result<(), StorageError>;
}

/// Generate a fresh event id.
///
/// UUIDv7 keeps ids unique across backends and roughly ordered by creation.
pub fn new_event_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Sort events into the canonical `(start_time, id)` order.
pub fn sort_events(events: &mut [Event]) {
    events.sort_by(|a, b| {
        a.start_time
            .cmp(&b.start_time)
            .then_with(|| a.id.cmp(&b.id))
    });
}
