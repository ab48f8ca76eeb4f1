//! Error types for archive expansion.

use tender_common::CommonError;
use thiserror::Error;

/// Errors produced while expanding a batch's archive.
#[derive(Debug, Error)]
pub enum ExpanderError {
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

    /// Malformed or unreadable zip archive.
    #[error("zip error: {0}")]
    Zip(String),

    /// A Blob operation failed.
    #[error("blob error: {0}")]
    Blob(String),

    /// A Store operation failed.
    #[error("store error: {0}")]
    Store(String),

    /// A Queue operation failed.
    #[error("queue error: {0}")]
    Queue(String),

    /// `expand_batch` was called on a batch not in `QUEUED`.
    #[error("batch already expanded or not in a valid start state")]
    AlreadyExpanded,
}

impl CommonError for ExpanderError {
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

impl From<std::io::Error> for ExpanderError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<anyhow::Error> for ExpanderError {
    fn from(e: anyhow::Error) -> Self {
        Self::Other(e.to_string())
    }
}

impl From<zip::result::ZipError> for ExpanderError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Zip(e.to_string())
    }
}

impl From<tender_blob::BlobError> for ExpanderError {
    fn from(e: tender_blob::BlobError) -> Self {
        Self::Blob(e.to_string())
    }
}

impl From<tender_store::StoreError> for ExpanderError {
    fn from(e: tender_store::StoreError) -> Self {
        Self::Store(e.to_string())
    }
}

impl From<tender_queue::QueueError> for ExpanderError {
    fn from(e: tender_queue::QueueError) -> Self {
        Self::Queue(e.to_string())
    }
}

/// Result type for Expander operations.
pub type ExpanderResult<T> = Result<T, ExpanderError>;
