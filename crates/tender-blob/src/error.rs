//! Error types for Blob operations.

use tender_common::CommonError;
use thiserror::Error;

/// Errors produced by a [`crate::Blob`] implementation.
#[derive(Debug, Error)]
pub enum BlobError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Parsing error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Generic / unclassified error.
    #[error("Other error: {0}")]
    Other(String),

    /// No object exists for the given key.
    #[error("not found: {0}")]
    NotFound(String),
}

impl CommonError for BlobError {
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

impl From<std::io::Error> for BlobError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(e.to_string())
        } else {
            Self::Io(e.to_string())
        }
    }
}

impl From<anyhow::Error> for BlobError {
    fn from(e: anyhow::Error) -> Self {
        Self::Other(e.to_string())
    }
}

/// Result type for Blob operations.
pub type BlobResult<T> = Result<T, BlobError>;
