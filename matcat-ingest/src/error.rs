//! Error types for matcat-ingest

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Ingestion pipeline error taxonomy
#[derive(Debug, Error)]
pub enum IngestError {
    /// Malformed candidate or invalid request payload
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Approve/reject attempted on a non-pending item (no-op notice)
    #[error("Already resolved: {0}")]
    AlreadyResolved(Uuid),

    /// Matching computation unavailable; callers degrade to empty matches
    #[error("Match computation unavailable: {0}")]
    MatchUnavailable(String),

    /// Storage failure during an approval commit; safe to retry
    #[error("Commit failed: {0}")]
    Commit(String),

    /// matcat-common error
    #[error(transparent)]
    Common(#[from] matcat_common::Error),
}

impl From<sqlx::Error> for IngestError {
    fn from(err: sqlx::Error) -> Self {
        Self::Common(matcat_common::Error::Database(err))
    }
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - e.g., item already resolved
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Retryable storage failure (503)
    #[error("Retryable failure: {0}")]
    Retryable(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// matcat-common error
    #[error("Common error: {0}")]
    Common(#[from] matcat_common::Error),
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Validation(msg) => ApiError::BadRequest(msg),
            IngestError::AlreadyResolved(id) => {
                ApiError::Conflict(format!("Pending entity already resolved: {}", id))
            }
            IngestError::MatchUnavailable(msg) => ApiError::Internal(msg),
            IngestError::Commit(msg) => ApiError::Retryable(msg),
            IngestError::Common(matcat_common::Error::NotFound(msg)) => ApiError::NotFound(msg),
            IngestError::Common(matcat_common::Error::InvalidInput(msg)) => {
                ApiError::BadRequest(msg)
            }
            IngestError::Common(err) => ApiError::Common(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Retryable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "COMMIT_RETRYABLE", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Other(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                err.to_string(),
            ),
            ApiError::Common(matcat_common::Error::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", msg)
            }
            ApiError::Common(matcat_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
