//! HTTP error type for the ledger API
//!
//! Every failure leaves the service as `{"error": {"code", "message", "details"?}}`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

use crate::domain::{LedgerError, ValidationError};

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Submission failed validation (400)
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Malformed request, e.g. unparsable JSON (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Generated batch id collided and retries ran out (409)
    #[error("Duplicate batch ID: {0}")]
    DuplicateBatchId(String),

    /// Verification did not answer in time (503)
    #[error("{0}")]
    VerificationTimeout(String),

    /// Internal server error (500); detail is logged, never returned
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Validation(e) => ApiError::Validation(e),
            LedgerError::NotFound(batch_id) => {
                ApiError::NotFound(format!("Collection event {} not found", batch_id))
            }
            LedgerError::DuplicateBatchId(id) => ApiError::DuplicateBatchId(id),
            e @ LedgerError::VerificationTimeout(_) => ApiError::VerificationTimeout(e.to_string()),
            e @ (LedgerError::Verification(_) | LedgerError::Persistence(_)) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details): (_, _, String, Option<Value>) = match self {
            ApiError::Validation(ref err) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                err.to_string(),
                Some(json!({ "fields": err.fields() })),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiError::DuplicateBatchId(id) => (
                StatusCode::CONFLICT,
                "DUPLICATE_BATCH_ID",
                format!("Batch ID {} already exists, please retry", id),
                Some(json!({ "retryable": true })),
            ),
            ApiError::VerificationTimeout(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "VERIFICATION_TIMEOUT",
                msg,
                Some(json!({ "retryable": true })),
            ),
            ApiError::Internal(detail) => {
                error!(error = %detail, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    INTERNAL_MESSAGE.to_string(),
                    None,
                )
            }
        };

        let mut error = json!({
            "code": error_code,
            "message": message,
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
