//! Row models.

pub mod event;
pub mod queue;
pub mod sender_log;
