//! PostgreSQL persistence for the calendar.
//!
//! - [`models`]: `FromRow` row structs.
//! - [`repositories`]: zero-sized repos with async query methods taking
//!   `&PgPool` (or a connection) as the first argument.
//! - [`storage`]: [`PgStorage`] and [`PgDeliveryLog`], the PostgreSQL
//!   implementations of the core storage traits.
//! - [`config`]: backend selection shared by every binary.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub mod config;
pub mod models;
pub mod repositories;
pub mod storage;

pub use config::{
    connect_shared_storage, connect_storage, BootstrapError, Storage, StorageBackend,
    StorageConfig,
};
pub use storage::{PgDeliveryLog, PgStorage};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to prove the pool can reach the server.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await
        .map(|_| ())
}

/// Apply every pending migration from `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
