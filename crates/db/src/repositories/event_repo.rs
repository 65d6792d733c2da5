//! Repository for the `events` table.

use calendar_core::event::Event;
use calendar_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::event::{offset_secs, EventRow};

/// Column list for `events` SELECT queries.
const COLUMNS: &str = "\
    id, title, description, owner_id, start_time, end_time, start_offset, end_offset, \
    notify_before, is_sent, created_at, updated_at";

/// Provides query operations for calendar events.
pub struct EventRepo;

impl EventRepo {
    /// Insert a new event unless its id is taken.
    ///
    /// Returns `false` when a row with the same id already exists; the
    /// existing row is left untouched.
    pub async fn insert(pool: &PgPool, event: &Event) -> Result<bool, sqlx::Error> {
        let inserted: Option<String> = sqlx::query_scalar(
            "INSERT INTO events \
                (id, title, description, owner_id, start_time, end_time, \
                 start_offset, end_offset, notify_before, is_sent) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (id) DO NOTHING \
             RETURNING id",
        )
        .bind(&event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.owner_id)
        .bind(event.start_utc())
        .bind(event.end_utc())
        .bind(offset_secs(&event.start_time))
        .bind(offset_secs(&event.end_time))
        .bind(i64::from(event.notify_before))
        .bind(event.is_sent)
        .fetch_optional(pool)
        .await?;
        Ok(inserted.is_some())
    }

    /// Overwrite every mutable column of the event with `id`.
    ///
    /// Returns `false` when no such event exists.
    pub async fn replace(pool: &PgPool, id: &str, event: &Event) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE events \
             SET title = $2, description = $3, owner_id = $4, \
                 start_time = $5, end_time = $6, start_offset = $7, end_offset = $8, \
                 notify_before = $9, is_sent = $10, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.owner_id)
        .bind(event.start_utc())
        .bind(event.end_utc())
        .bind(offset_secs(&event.start_time))
        .bind(offset_secs(&event.end_time))
        .bind(i64::from(event.notify_before))
        .bind(event.is_sent)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an event. Returns `false` when it did not exist.
    pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Events starting in `[start, end)`, ordered by start time then id.
    pub async fn list_starting_between(
        pool: &PgPool,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<EventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM events \
             WHERE start_time >= $1 AND start_time < $2 \
             ORDER BY start_time, id"
        );
        sqlx::query_as::<_, EventRow>(&query)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await
    }

    /// Unsent events whose notification window opened before `cutoff`,
    /// i.e. `start_time - notify_before hours < cutoff`.
    pub async fn list_due_for_notification(
        pool: &PgPool,
        cutoff: Timestamp,
        limit: i64,
    ) -> Result<Vec<EventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM events \
             WHERE is_sent = FALSE AND notify_before > 0 \
               AND EXTRACT(EPOCH FROM (start_time - $1::timestamptz)) < notify_before * 3600 \
             ORDER BY start_time, id \
             LIMIT $2"
        );
        sqlx::query_as::<_, EventRow>(&query)
            .bind(cutoff)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Flag the listed events as sent. Returns the number of rows touched.
    pub async fn mark_sent(pool: &PgPool, ids: &[String]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "UPDATE events SET is_sent = TRUE, updated_at = NOW() WHERE id = ANY($1)",
        )
        .bind(ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete every event that started before `cutoff`.
    pub async fn delete_started_before(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM events WHERE start_time < $1")
            .bind(cutoff)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
