//! Repository for the `notification_queue` table.
//!
//! Claiming uses `SELECT FOR UPDATE SKIP LOCKED` inside the caller's
//! transaction: the row stays locked while the message is handled and is
//! only removed when the caller deletes it and commits.

use sqlx::{PgConnection, PgPool};

use crate::models::queue::QueuedMessage;

const COLUMNS: &str = "id, queue, payload, enqueued_at";

/// Provides enqueue/claim operations for the broker queue.
pub struct QueueRepo;

impl QueueRepo {
    /// Append a payload to `queue`, returning the message id.
    pub async fn enqueue(pool: &PgPool, queue: &str, payload: &[u8]) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO notification_queue (queue, payload) VALUES ($1, $2) RETURNING id",
        )
        .bind(queue)
        .bind(payload)
        .fetch_one(pool)
        .await
    }

    /// Lock the oldest unclaimed message of `queue`.
    pub async fn claim_next(
        conn: &mut PgConnection,
        queue: &str,
    ) -> Result<Option<QueuedMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_queue \
             WHERE queue = $1 \
             ORDER BY id \
             LIMIT 1 \
             FOR UPDATE SKIP LOCKED"
        );
        sqlx::query_as::<_, QueuedMessage>(&query)
            .bind(queue)
            .fetch_optional(conn)
            .await
    }

    /// Acknowledge a claimed message.
    pub async fn delete(conn: &mut PgConnection, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM notification_queue WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(())
    }

    /// Number of messages waiting in `queue`.
    pub async fn depth(pool: &PgPool, queue: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM notification_queue WHERE queue = $1")
            .bind(queue)
            .fetch_one(pool)
            .await
    }
}
