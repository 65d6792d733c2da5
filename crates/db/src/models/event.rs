//! Event entity model.

use calendar_core::error::StorageError;
use calendar_core::event::Event;
use calendar_core::types::{EventTime, Timestamp};
use chrono::FixedOffset;
use sqlx::FromRow;

/// A row from the `events` table.
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub owner_id: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    /// Seconds east of UTC the start was written in.
    pub start_offset: i32,
    pub end_offset: i32,
    pub notify_before: i64,
    pub is_sent: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<EventRow> for Event {
    type Error = StorageError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let notify_before = u32::try_from(row.notify_before).map_err(StorageError::backend)?;
        Ok(Event {
            id: row.id,
            title: row.title,
            start_time: zoned(row.start_time, row.start_offset)?,
            end_time: zoned(row.end_time, row.end_offset)?,
            description: row.description,
            owner_id: row.owner_id,
            notify_before,
            is_sent: row.is_sent,
        })
    }
}

/// Re-attach a stored offset to a UTC instant.
fn zoned(instant: Timestamp, offset_secs: i32) -> Result<EventTime, StorageError> {
    let offset = FixedOffset::east_opt(offset_secs).ok_or_else(|| {
        StorageError::backend(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("stored UTC offset out of range: {offset_secs}"),
        ))
    })?;
    Ok(instant.with_timezone(&offset))
}

/// Seconds east of UTC for `time`, as stored next to the instant.
pub fn offset_secs(time: &EventTime) -> i32 {
    time.offset().local_minus_utc()
}

/// Convert a batch of rows, failing on the first malformed one.
pub fn into_events(rows: Vec<EventRow>) -> Result<Vec<Event>, StorageError> {
    rows.into_iter().map(Event::try_from).collect()
}
