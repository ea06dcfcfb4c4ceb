//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and how workflow
//! errors are rendered as HTTP responses.

use axum::http::StatusCode;
use course_file_core::PortError;
use tracing::error;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// A schema migration failed at startup.
    #[error("Migration Error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The HTTP status a workflow error is reported with.
pub fn status_for(err: &PortError) -> StatusCode {
    match err {
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Unauthorized(_) => StatusCode::FORBIDDEN,
        PortError::Conflict(_) => StatusCode::CONFLICT,
        PortError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Converts a workflow error into the `(status, message)` pair handlers return.
///
/// Store failures are logged and replaced by a generic message.
pub fn into_http(err: PortError) -> (StatusCode, String) {
    let status = status_for(&err);
    match err {
        PortError::Unexpected(detail) => {
            error!("Unexpected store error: {}", detail);
            (status, "Internal server error".to_string())
        }
        PortError::NotFound(msg)
        | PortError::Unauthorized(msg)
        | PortError::Conflict(msg)
        | PortError::InvalidState(msg) => (status, msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_errors_map_to_distinct_statuses() {
        let cases = [
            (PortError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (PortError::Unauthorized("x".into()), StatusCode::FORBIDDEN),
            (PortError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                PortError::InvalidState("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                PortError::Unexpected("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(status_for(&err), status, "{err}");
        }
    }

    #[test]
    fn store_failures_do_not_leak_details() {
        let (status, body) = into_http(PortError::Unexpected("connection reset by peer".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.contains("peer"));

        let (status, body) = into_http(PortError::InvalidState("CC must review first".into()));
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, "CC must review first");
    }
}
