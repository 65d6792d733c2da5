//! In-memory storage backends.
//!
//! [`MemoryStorage`] keeps events in a `HashMap` behind a single
//! `tokio::sync::RwLock`: range queries and notifier selection share the read
//! lock, every mutation takes the write lock for its whole duration.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Utc, Weekday};
use tokio::sync::RwLock;

use super::{new_event_id, sort_events, DeliveryLog, EventStorage};
use crate::calendar::{TimeWindow, DEFAULT_FIRST_WEEKDAY};
use crate::error::StorageError;
use crate::event::{DeliveryLogEntry, Event, NotificationMessage};
use crate::types::Timestamp;

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Process-local event store.
pub struct MemoryStorage {
    events: RwLock<HashMap<String, Event>>,
    first_weekday: Weekday,
}

impl MemoryStorage {
    pub fn new(first_weekday: Weekday) -> Self {
        Self {
            events: RwLock::new(HashMap::new()),
            first_weekday,
        }
    }

    /// Number of stored events.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new(DEFAULT_FIRST_WEEKDAY)
    }
}

#[async_trait]
impl EventStorage for MemoryStorage {
    fn first_weekday(&self) -> Weekday {
        self.first_weekday
    }

    async fn add_event(&self, mut event: Event) -> Result<String, StorageError> {
        event.validate(Utc::now())?;

        let mut events = self.events.write().await;
        if event.id.is_empty() {
            event.id = new_event_id();
        } else if events.contains_key(&event.id) {
            return Err(StorageError::DuplicateEventId { id: event.id });
        }

        let id = event.id.clone();
        events.insert(id.clone(), event);
        Ok(id)
    }

    async fn update_event(&self, id: &str, mut event: Event) -> Result<(), StorageError> {
        event.validate(Utc::now())?;

        let mut events = self.events.write().await;
        let stored = events
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFoundEvent { id: id.to_string() })?;
        event.id = id.to_string();
        *stored = event;
        Ok(())
    }

    async fn remove_event(&self, id: &str) -> Result<(), StorageError> {
        self.events
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFoundEvent { id: id.to_string() })
    }

    async fn get_events_in_range(&self, window: TimeWindow) -> Result<Vec<Event>, StorageError> {
        let mut found: Vec<Event> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| window.contains(e.start_utc()))
            .cloned()
            .collect();
        sort_events(&mut found);
        Ok(found)
    }

    async fn get_events_by_notifier(
        &self,
        limit: usize,
        cutoff: Timestamp,
    ) -> Result<Vec<Event>, StorageError> {
        let mut due: Vec<Event> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| e.is_notification_due(cutoff))
            .cloned()
            .collect();
        sort_events(&mut due);
        due.truncate(limit);
        Ok(due)
    }

    async fn mark_sent_events(&self, ids: &[String]) -> Result<(), StorageError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut events = self.events.write().await;
        for id in ids {
            if let Some(event) = events.get_mut(id) {
                event.is_sent = true;
            }
        }
        Ok(())
    }

    async fn remove_older_than(&self, cutoff: Timestamp) -> Result<u64, StorageError> {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|_, e| e.start_utc() >= cutoff);
        Ok((before - events.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// MemoryDeliveryLog
// ---------------------------------------------------------------------------

/// Process-local delivery log.
#[derive(Default)]
pub struct MemoryDeliveryLog {
    entries: RwLock<Vec<DeliveryLogEntry>>,
}

impl MemoryDeliveryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every entry in arrival order.
    pub async fn entries(&self) -> Vec<DeliveryLogEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl DeliveryLog for MemoryDeliveryLog {
    async fn add_sender_log(&self, message: &NotificationMessage) -> Result<(), StorageError> {
        let entry = DeliveryLogEntry::new(message, Utc::now());
        self.entries.write().await.push(entry);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
