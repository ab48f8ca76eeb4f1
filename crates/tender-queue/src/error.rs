//! Error types for Queue operations.

use tender_common::CommonError;
use thiserror::Error;

/// Errors produced by a [`crate::Queue`] implementation.
#[derive(Debug, Error)]
pub enum QueueError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Parsing error (e.g. malformed envelope JSON).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Generic / unclassified error.
    #[error("Other error: {0}")]
    Other(String),

    /// Redis connection or command failure.
    #[error("connection error: {0}")]
    Connection(String),

    /// Envelope could not be (de)serialised.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl CommonError for QueueError {
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

impl From<std::io::Error> for QueueError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<anyhow::Error> for QueueError {
    fn from(e: anyhow::Error) -> Self {
        Self::Other(e.to_string())
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<redis::RedisError> for QueueError {
    fn from(e: redis::RedisError) -> Self {
        Self::Connection(e.to_string())
    }
}

/// Result type for Queue operations.
pub type QueueResult<T> = Result<T, QueueError>;
