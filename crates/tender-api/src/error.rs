//! API error type with an `IntoResponse` mapping to the HTTP surface's
//! status code contract (§4.8): validation failures to 4xx, retryable
//! server errors to 5xx, lookup misses to 404.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tender_common::CommonError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Other error: {0}")]
    Other(String),

    /// The uploaded archive failed validation (not an archive, over the
    /// size limit).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced batch does not exist.
    #[error("batch not found: {0}")]
    NotFound(String),

    /// Too many `process` triggers for the same batch in a short window.
    #[error("rate limited: {0}")]
    RateLimited(String),
}

impl CommonError for ApiError {
    fn io_error(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    fn config_error(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    fn parse_error(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    fn other_error(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

impl From<tender_store::StoreError> for ApiError {
    fn from(e: tender_store::StoreError) -> Self {
        Self::Other(e.to_string())
    }
}

impl From<tender_blob::BlobError> for ApiError {
    fn from(e: tender_blob::BlobError) -> Self {
        Self::Other(e.to_string())
    }
}

impl From<tender_queue::QueueError> for ApiError {
    fn from(e: tender_queue::QueueError) -> Self {
        Self::Other(e.to_string())
    }
}

impl From<tender_worker::WorkerError> for ApiError {
    fn from(e: tender_worker::WorkerError) -> Self {
        Self::Other(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Io(_) | Self::Configuration(_) | Self::Parse(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
