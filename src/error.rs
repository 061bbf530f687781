use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;
use tracing::error;

use crate::schemas::ErrorResponse;

/// Error taxonomy shared by every handler. Each variant carries the
/// caller-visible message; storage errors are logged in full and reduced to
/// a generic message before leaving the server.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed or expired credential.
    #[error("{0}")]
    Unauthenticated(String),
    /// Authenticated, but the role or ownership check failed.
    #[error("{0}")]
    Forbidden(String),
    /// Referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Uniqueness violation (email, one rating per user and store).
    #[error("{0}")]
    Conflict(String),
    /// Validation failure: length bounds, rating range, malformed reference.
    #[error("{0}")]
    InvalidArgument(String),
    /// Unexpected storage failure.
    #[error(transparent)]
    Database(#[from] DbErr),
    /// Anything else that should never happen in a healthy deployment
    /// (hashing or token signing failures).
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status and machine-readable code for this error.
    ///
    /// A unique-constraint violation bubbling up from the driver is a race
    /// the explicit pre-checks lost, so it still surfaces as a conflict.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
            ApiError::Database(e) => {
                if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    (StatusCode::CONFLICT, "CONFLICT")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            ApiError::Database(e) => {
                if status == StatusCode::CONFLICT {
                    "Resource already exists".to_string()
                } else {
                    error!("Database error: {}", e);
                    "Internal server error".to_string()
                }
            }
            ApiError::Internal(detail) => {
                error!("Internal error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (
            status,
            Json(ErrorResponse {
                error: message,
                code: code.to_string(),
                success: false,
            }),
        )
            .into_response()
    }
}
