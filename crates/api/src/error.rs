use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use calendar_core::error::StorageError;

/// Application-level error type for HTTP handlers.
///
/// Every failure is reported as `500 Internal Server Error` with the error
/// message as a plain-text body, which is what existing clients of the
/// calendar service parse.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A storage failure, prefixed with the operation that hit it
    /// (e.g. `update event 42`).
    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: StorageError,
    },

    /// The request body could not be read or decoded.
    #[error("invalid request body: {0}")]
    InvalidBody(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn storage(context: impl Into<String>, source: StorageError) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Storage { source, .. } if source.is_caller_error() => {
                tracing::warn!(error = %self, "Request rejected");
            }
            AppError::Storage { .. } => {
                tracing::error!(error = %self, "Storage failure");
            }
            AppError::InvalidBody(_) => {
                tracing::warn!(error = %self, "Malformed request");
            }
        }

        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_carries_operation_and_id() {
        let err = AppError::storage(
            "update event 42",
            StorageError::NotFoundEvent { id: "42".into() },
        );
        assert_eq!(err.to_string(), "update event 42: event not found: 42");
    }

    #[test]
    fn every_error_is_a_500() {
        let response = AppError::InvalidBody("EOF".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
