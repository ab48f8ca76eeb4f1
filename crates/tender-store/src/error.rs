//! Error types for Store operations.

use tender_common::{CommonError, impl_common_conversions};
use thiserror::Error;

/// Errors produced by a [`crate::traits::Store`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Parsing error (e.g. malformed `extracted` JSON).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Generic / unclassified error.
    #[error("Other error: {0}")]
    Other(String),

    /// `CreateBatch` collided with an existing `batch_id`.
    #[error("batch already exists: {0}")]
    AlreadyExists(String),

    /// The referenced batch or work item does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// `ClaimWorkItem` was attempted on a WorkItem not in `PENDING`.
    #[error("work item not claimable, current state: {0}")]
    NotClaimable(String),

    /// The underlying database reported an error.
    #[error("database error: {0}")]
    Database(String),
}

impl CommonError for StoreError {
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

impl_common_conversions!(StoreError, with_serde);

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::Database(e.to_string())
    }
}

/// Result type for Store operations.
pub type StoreResult<T> = Result<T, StoreError>;
