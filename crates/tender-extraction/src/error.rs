//! Error types for the file-parsing and LLM extraction contracts.

use tender_common::CommonError;
use thiserror::Error;

/// Classification mirroring the Worker's error taxonomy. `ExtractionError`
/// carries the class itself so the Worker doesn't need to pattern-match on
/// message text to decide retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionErrorKind {
    Retryable,
    Timeout,
    RateLimit,
    LlmError,
    ParseError,
    Permanent,
    Unknown,
}

/// Error produced by an [`crate::traits::Extractor`] or [`crate::traits::Llm`]
/// call. Carries both a human-readable message and the taxonomy class the
/// Worker uses to decide retry policy.
#[derive(Debug, Error)]
#[error("{kind:?}: {message}")]
pub struct ExtractionError {
    pub kind: ExtractionErrorKind,
    pub message: String,
}

impl ExtractionError {
    pub fn new(kind: ExtractionErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::ParseError, message)
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::RateLimit, message)
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::Permanent, message)
    }
}

impl CommonError for ExtractionError {
    fn io_error(msg: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::Retryable, msg)
    }

    fn config_error(msg: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::Permanent, msg)
    }

    fn parse_error(msg: impl Into<String>) -> Self {
        Self::parse(msg)
    }

    fn other_error(msg: impl Into<String>) -> Self {
        Self::new(ExtractionErrorKind::Unknown, msg)
    }
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;
