//! Error types for the consume/reap/finalize/aggregate loops.

use tender_common::CommonError;
use thiserror::Error;

/// Errors produced by the Worker's internal operations. Per-file extraction
/// failures are not represented here — those are classified and absorbed
/// into WorkItem state (§7); this type covers Store/Queue/Blob plumbing
/// failures that the loops themselves cannot recover from.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Other error: {0}")]
    Other(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("blob error: {0}")]
    Blob(String),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("expander error: {0}")]
    Expander(String),
}

impl CommonError for WorkerError {
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

impl From<anyhow::Error> for WorkerError {
    fn from(e: anyhow::Error) -> Self {
        Self::Other(e.to_string())
    }
}

impl From<tender_store::StoreError> for WorkerError {
    fn from(e: tender_store::StoreError) -> Self {
        Self::Store(e.to_string())
    }
}

impl From<tender_blob::BlobError> for WorkerError {
    fn from(e: tender_blob::BlobError) -> Self {
        Self::Blob(e.to_string())
    }
}

impl From<tender_queue::QueueError> for WorkerError {
    fn from(e: tender_queue::QueueError) -> Self {
        Self::Queue(e.to_string())
    }
}

impl From<tender_expander::ExpanderError> for WorkerError {
    fn from(e: tender_expander::ExpanderError) -> Self {
        Self::Expander(e.to_string())
    }
}

pub type WorkerResult<T> = Result<T, WorkerError>;
