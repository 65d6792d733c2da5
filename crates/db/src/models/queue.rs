use calendar_core::types::Timestamp;
use sqlx::FromRow;

/// A message waiting in `notification_queue`.
#[derive(Debug, Clone, FromRow)]
pub struct QueuedMessage {
    pub id: i64,
    pub queue: String,
    pub payload: Vec<u8>,
    pub enqueued_at: Timestamp,
}
