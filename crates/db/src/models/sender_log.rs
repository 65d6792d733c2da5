//! Sender delivery log model.

use calendar_core::types::Timestamp;
use sqlx::FromRow;

/// A row from the `sender_logs` table.
#[derive(Debug, Clone, FromRow)]
pub struct SenderLogRow {
    pub id: i64,
    pub event_id: String,
    pub name: String,
    pub event_time: Timestamp,
    pub owner_id: String,
    pub received_at: Timestamp,
}
