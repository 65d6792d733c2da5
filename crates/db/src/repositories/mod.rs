//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` (or a transaction's connection) as the first
//! argument.

pub mod event_repo;
pub mod queue_repo;
pub mod sender_log_repo;

pub use event_repo::EventRepo;
pub use queue_repo::QueueRepo;
pub use sender_log_repo::SenderLogRepo;
