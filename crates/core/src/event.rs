//! Calendar event entity and its wire projections.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::types::{rfc3339, EventTime, Timestamp};

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A calendar entry with a time window and an optional notification lead
/// time.
///
/// The JSON form uses camelCase keys. `is_sent` is store-internal state and
/// never crosses the wire. Start and end keep the offset the caller wrote
/// them in; comparisons and range queries use the UTC instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Opaque unique id. Empty on creation means "assign one".
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(with = "rfc3339")]
    pub start_time: EventTime,
    #[serde(with = "rfc3339")]
    pub end_time: EventTime,
    #[serde(default)]
    pub description: String,
    #[serde(default, alias = "ownerID")]
    pub owner_id: String,
    /// Notification lead time in whole hours; `0` disables notification.
    #[serde(default)]
    pub notify_before: u32,
    #[serde(skip)]
    pub is_sent: bool,
}

impl Event {
    pub fn start_utc(&self) -> Timestamp {
        self.start_time.with_timezone(&Utc)
    }

    pub fn end_utc(&self) -> Timestamp {
        self.end_time.with_timezone(&Utc)
    }

    /// Check the time invariants against `now`.
    ///
    /// The end must be strictly after the start, and the start strictly in
    /// the future.
    pub fn validate(&self, now: Timestamp) -> Result<(), StorageError> {
        if self.end_utc() <= self.start_utc() {
            return Err(StorageError::IncorrectEventTime(
                "event end time must be after its start time",
            ));
        }
        if self.start_utc() <= now {
            return Err(StorageError::IncorrectEventTime(
                "start time of the event must be in the future",
            ));
        }
        Ok(())
    }

    /// [`validate`](Self::validate) against the current wall clock.
    pub fn validate_now(&self) -> Result<(), StorageError> {
        self.validate(Utc::now())
    }

    /// The instant the notification window opens, or `None` when the event
    /// does not want a notification.
    pub fn notify_at(&self) -> Option<Timestamp> {
        if self.notify_before == 0 {
            return None;
        }
        self.start_utc()
            .checked_sub_signed(Duration::hours(i64::from(self.notify_before)))
    }

    /// Whether the scheduler should pick this event up for `cutoff`.
    pub fn is_notification_due(&self, cutoff: Timestamp) -> bool {
        if self.is_sent || self.notify_before == 0 {
            return false;
        }
        // An unrepresentable window start lies before any cutoff.
        match self.notify_at() {
            Some(at) => at < cutoff,
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationMessage
// ---------------------------------------------------------------------------

/// Broker payload published by the scheduler for every due event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Time", with = "rfc3339")]
    pub time: EventTime,
    #[serde(rename = "OwnerID")]
    pub owner_id: String,
}

impl From<&Event> for NotificationMessage {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id.clone(),
            name: event.title.clone(),
            time: event.start_time,
            owner_id: event.owner_id.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// DeliveryLogEntry
// ---------------------------------------------------------------------------

/// A record that the sender received a [`NotificationMessage`].
///
/// Entries are append-only; the same `id` may appear several times when the
/// broker redelivers. Times are normalised to UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryLogEntry {
    pub id: String,
    pub name: String,
    pub time: Timestamp,
    pub owner_id: String,
    pub received_at: Timestamp,
}

impl DeliveryLogEntry {
    pub fn new(message: &NotificationMessage, received_at: Timestamp) -> Self {
        Self {
            id: message.id.clone(),
            name: message.name.clone(),
            time: message.time.with_timezone(&Utc),
            owner_id: message.owner_id.clone(),
            received_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
