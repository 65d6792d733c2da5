//! Notification pipeline for the calendar.
//!
//! - [`broker`]: the [`Broker`] bridge between the scheduler and the
//!   sender, with an in-process [`MemoryBroker`] and a durable
//!   PostgreSQL-backed [`PgBroker`].
//! - [`scheduler`]: [`NotificationScheduler`], which publishes due event
//!   reminders and sweeps expired events.
//! - [`sender`]: [`Sender`], the consuming side that records every
//!   received notification in the delivery log.

pub mod broker;
pub mod scheduler;
pub mod sender;

pub use broker::{Broker, BrokerConfig, BrokerError, MemoryBroker, MessageHandler, PgBroker};
pub use scheduler::{NotificationScheduler, SchedulerConfig, SchedulerError};
pub use sender::{Sender, SenderError};
