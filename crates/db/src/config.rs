//! Storage backend selection.
//!
//! Both the HTTP service and the worker processes open their store through
//! this module, so the `STORAGE_BACKEND` switch behaves the same in every
//! binary. Workers go through [`connect_shared_storage`], which refuses the
//! process-local in-memory backend.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use calendar_core::calendar::DEFAULT_FIRST_WEEKDAY;
use calendar_core::config::{env_optional, env_or, env_secs, ConfigError};
use calendar_core::storage::{DeliveryLog, EventStorage, MemoryDeliveryLog, MemoryStorage};
use chrono::Weekday;

use crate::storage::{PgDeliveryLog, PgStorage};
use crate::DbPool;

/// Which implementation backs the event store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => Ok(Self::Memory),
            "postgres" | "postgresql" | "sql" => Ok(Self::Postgres),
            other => Err(format!(
                "unknown storage backend '{other}' (expected memory or postgres)"
            )),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Postgres => f.write_str("postgres"),
        }
    }
}

/// Storage settings read from the environment.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Required when `backend` is [`StorageBackend::Postgres`].
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Upper bound for every individual storage call.
    pub operation_timeout: Duration,
    pub first_weekday: Weekday,
}

impl StorageConfig {
    /// Load from environment variables.
    ///
    /// | Env var                | Default  |
    /// |------------------------|----------|
    /// | `STORAGE_BACKEND`      | `memory` |
    /// | `DATABASE_URL`         | unset    |
    /// | `DB_MAX_CONNECTIONS`   | `20`     |
    /// | `STORAGE_TIMEOUT_SECS` | `5`      |
    /// | `FIRST_WEEKDAY`        | `monday` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            backend: env_or("STORAGE_BACKEND", StorageBackend::Memory)?,
            database_url: env_optional("DATABASE_URL"),
            max_connections: env_or("DB_MAX_CONNECTIONS", 20)?,
            operation_timeout: env_secs("STORAGE_TIMEOUT_SECS", 5)?,
            first_weekday: env_or("FIRST_WEEKDAY", DEFAULT_FIRST_WEEKDAY)?,
        })
    }
}

/// Failure while opening the configured backend.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("DATABASE_URL must be set when STORAGE_BACKEND=postgres")]
    MissingDatabaseUrl,

    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to run database migrations: {0}")]
    Migrate(#[source] sqlx::migrate::MigrateError),

    #[error(
        "{process} cannot use STORAGE_BACKEND={backend}: its state is process-local \
         and not durable; set STORAGE_BACKEND=postgres"
    )]
    ProcessLocalBackend {
        process: &'static str,
        backend: StorageBackend,
    },
}

/// Handles to an opened backend.
#[derive(Clone)]
pub struct Storage {
    pub events: Arc<dyn EventStorage>,
    pub delivery_log: Arc<dyn DeliveryLog>,
    /// Present for the PostgreSQL backend; `None` for in-memory storage.
    pub pool: Option<DbPool>,
}

impl Storage {
    /// Fresh in-memory backend.
    pub fn memory(first_weekday: Weekday) -> Self {
        Self {
            events: Arc::new(MemoryStorage::new(first_weekday)),
            delivery_log: Arc::new(MemoryDeliveryLog::new()),
            pool: None,
        }
    }

    /// PostgreSQL backend over an existing, migrated pool.
    pub fn postgres(pool: DbPool, first_weekday: Weekday, timeout: Duration) -> Self {
        Self {
            events: Arc::new(PgStorage::new(pool.clone(), first_weekday, timeout)),
            delivery_log: Arc::new(PgDeliveryLog::new(pool.clone(), timeout)),
            pool: Some(pool),
        }
    }
}

/// Open the backend described by `config`.
///
/// For PostgreSQL this creates the pool, verifies connectivity and applies
/// pending migrations before handing the store out.
pub async fn connect_storage(config: &StorageConfig) -> Result<Storage, BootstrapError> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!(first_weekday = %config.first_weekday, "Using in-memory storage");
            Ok(Storage::memory(config.first_weekday))
        }
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or(BootstrapError::MissingDatabaseUrl)?;

            let pool = crate::create_pool(url, config.max_connections, config.operation_timeout)
                .await
                .map_err(BootstrapError::Connect)?;
            tracing::info!(
                max_connections = config.max_connections,
                "Database connection pool created"
            );

            crate::health_check(&pool)
                .await
                .map_err(BootstrapError::Connect)?;
            tracing::info!("Database health check passed");

            crate::run_migrations(&pool)
                .await
                .map_err(BootstrapError::Migrate)?;
            tracing::info!("Database migrations applied");

            Ok(Storage::postgres(
                pool,
                config.first_weekday,
                config.operation_timeout,
            ))
        }
    }
}

/// Open the backend for a process that shares state with other processes.
///
/// The scheduler reads events written by the HTTP service and the sender's
/// delivery log must outlive it, so only PostgreSQL is accepted.
pub async fn connect_shared_storage(
    config: &StorageConfig,
    process: &'static str,
) -> Result<Storage, BootstrapError> {
    if config.backend == StorageBackend::Memory {
        return Err(BootstrapError::ProcessLocalBackend {
            process,
            backend: config.backend,
        });
    }
    connect_storage(config).await
}
