use std::time::Duration;

use chrono::NaiveDate;

/// Boxed error used to carry backend-specific failures (sqlx, I/O) through
/// the backend-agnostic storage traits.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by [`EventStorage`](crate::storage::EventStorage) and
/// [`DeliveryLog`](crate::storage::DeliveryLog) implementations.
///
/// The first four variants are caller errors and are always surfaced
/// unchanged; the last two describe the backend itself.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("event with same ID exists: {id}")]
    DuplicateEventId { id: String },

    #[error("event not found: {id}")]
    NotFoundEvent { id: String },

    #[error("incorrect event time: {0}")]
    IncorrectEventTime(&'static str),

    #[error("date should be a first day of requested period: {date}")]
    IncorrectStartDate { date: NaiveDate },

    #[error("storage operation {operation} exceeded its {timeout:?} deadline")]
    DeadlineExceeded {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("storage backend error: {0}")]
    Backend(#[source] BoxError),
}

impl StorageError {
    /// Wrap a backend failure.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }

    /// `true` for errors caused by the request itself rather than the store.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateEventId { .. }
                | Self::NotFoundEvent { .. }
                | Self::IncorrectEventTime(_)
                | Self::IncorrectStartDate { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_offending_id() {
        let err = StorageError::NotFoundEvent { id: "42".into() };
        assert_eq!(err.to_string(), "event not found: 42");

        let err = StorageError::DuplicateEventId { id: "7".into() };
        assert_eq!(err.to_string(), "event with same ID exists: 7");
    }

    #[test]
    fn backend_errors_are_not_caller_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        assert!(!StorageError::backend(io).is_caller_error());
        assert!(StorageError::IncorrectEventTime("end before start").is_caller_error());
    }
}
