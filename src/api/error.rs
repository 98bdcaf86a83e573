//! Translation of service failures into JSON error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use crate::error::{HistoryError, StatusError};

/// Error body message for an unreachable ledger.
pub const DATABASE_UNAVAILABLE: &str = "Database connection failed";
/// Error body message for a missing or unusable snapshot.
pub const SNAPSHOT_UNAVAILABLE: &str = "Predictions data not available";
/// Error body message for unknown routes.
pub const RESOURCE_NOT_FOUND: &str = "Resource not found";
/// Error body message for handler panics.
pub const INTERNAL_SERVER_ERROR: &str = "Internal server error";

/// Error returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Http { status: StatusCode, message: String },
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error(transparent)]
    History(#[from] HistoryError),
}

impl ApiError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Http {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    fn parts(&self) -> (StatusCode, String) {
        match self {
            ApiError::Http { status, message } => (*status, message.clone()),
            ApiError::Status(StatusError::LedgerUnavailable(_))
            | ApiError::History(HistoryError::LedgerUnavailable(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                DATABASE_UNAVAILABLE.to_string(),
            ),
            ApiError::Status(StatusError::SnapshotUnavailable(_)) => {
                (StatusCode::NOT_FOUND, SNAPSHOT_UNAVAILABLE.to_string())
            }
            ApiError::Status(StatusError::Internal(e))
            | ApiError::History(HistoryError::Internal(e)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("An internal error occurred: {e}"),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.parts();
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
