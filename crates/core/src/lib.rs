//! Calendar domain core.
//!
//! No internal dependencies, so every other crate in the workspace (the
//! PostgreSQL layer, the notification pipeline, the HTTP service) can share
//! the same vocabulary:
//!
//! - [`event`]: the [`Event`](event::Event) entity and its broker/log
//!   projections.
//! - [`error`]: the [`StorageError`](error::StorageError) taxonomy.
//! - [`calendar`]: day/week/month window arithmetic.
//! - [`storage`]: the [`EventStorage`](storage::EventStorage) and
//!   [`DeliveryLog`](storage::DeliveryLog) capability traits plus the
//!   in-memory backends.
//! - [`config`]: environment-variable helpers shared by all binaries.
//! - [`runtime`]: tracing setup and shutdown signals for the binaries.

pub mod calendar;
pub mod config;
pub mod error;
pub mod event;
pub mod runtime;
pub mod storage;
pub mod types;
