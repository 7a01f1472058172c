//! services/api/src/error.rs
//!
//! Defines the error types for the API service: `ApiError` for startup and
//! `AppError` for request handlers.

use crate::config::ConfigError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use countdown_core::{PortError, TrackerError};
use serde_json::json;
use tracing::error;

/// The primary error type for starting the `api` service.
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

    /// Represents an error while applying database migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Error returned by HTTP handlers, rendered as `{ "error", "code" }` JSON.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Port(#[from] PortError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Tracker(tracker) => match tracker {
                TrackerError::AuthRequired => {
                    (StatusCode::UNAUTHORIZED, "AUTH_REQUIRED", tracker.to_string())
                }
                TrackerError::InvalidConfig(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_CONFIG", tracker.to_string())
                }
                TrackerError::InvalidMessage(_) | TrackerError::InvalidProgress(_) => {
                    (StatusCode::BAD_REQUEST, "BAD_REQUEST", tracker.to_string())
                }
                TrackerError::InvalidTransition { .. } => {
                    (StatusCode::CONFLICT, "CONFLICT", tracker.to_string())
                }
                TrackerError::WriteFailure(e) => {
                    error!("Write rejected by the document store: {}", e);
                    (
                        StatusCode::BAD_GATEWAY,
                        "WRITE_FAILED",
                        "Could not save, check your connection".to_string(),
                    )
                }
            },
            AppError::Port(PortError::Unauthorized) => {
                (StatusCode::UNAUTHORIZED, "AUTH_REQUIRED", "Unauthorized".to_string())
            }
            AppError::Port(PortError::NotFound(what)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", what.clone())
            }
            AppError::Port(PortError::Unexpected(msg)) => {
                error!("Unexpected port error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });
        (status, axum::Json(body)).into_response()
    }
}
