//! Repository for the `sender_logs` table (append-only).

use calendar_core::event::DeliveryLogEntry;
use sqlx::PgPool;

use crate::models::sender_log::SenderLogRow;

const COLUMNS: &str = "id, event_id, name, event_time, owner_id, received_at";

/// Provides write and audit-read operations for the sender's delivery log.
pub struct SenderLogRepo;

impl SenderLogRepo {
    /// Append one delivery record, returning its row id.
    pub async fn insert(pool: &PgPool, entry: &DeliveryLogEntry) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO sender_logs (event_id, name, event_time, owner_id, received_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(&entry.id)
        .bind(&entry.name)
        .bind(entry.time)
        .bind(&entry.owner_id)
        .bind(entry.received_at)
        .fetch_one(pool)
        .await
    }

    /// Every delivery recorded for `event_id`, oldest first.
    pub async fn list_for_event(
        pool: &PgPool,
        event_id: &str,
    ) -> Result<Vec<SenderLogRow>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM sender_logs WHERE event_id = $1 ORDER BY id");
        sqlx::query_as::<_, SenderLogRow>(&query)
            .bind(event_id)
            .fetch_all(pool)
            .await
    }
}
