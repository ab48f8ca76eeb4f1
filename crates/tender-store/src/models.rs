//! Domain entities: Batch, WorkItem, Summary, Alert.
//!
//! Store exclusively owns mutation of these entities; every other component
//! reaches them only through [`crate::traits::Store`] operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`Batch`]. Terminal states are absorbing: once
/// reached, no operation in the core transitions a batch away from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchState {
    /// Ready to be expanded, or ready to be scheduled once expansion ends.
    Queued,
    /// Archive expansion is in progress.
    Extracting,
    /// At least one WorkItem has left PENDING; work is underway.
    Processing,
    /// Terminal: all files succeeded.
    Completed,
    /// Terminal: all files reached a terminal state but at least one failed.
    CompletedWithErrors,
    /// Terminal: the batch itself failed (e.g. expansion found nothing).
    Failed,
}

impl BatchState {
    /// Whether this state is absorbing (no further lifecycle transitions).
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::CompletedWithErrors | Self::Failed
        )
    }
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "QUEUED",
            Self::Extracting => "EXTRACTING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::CompletedWithErrors => "COMPLETED_WITH_ERRORS",
            Self::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

/// An operator-submitted unit of work corresponding to one uploaded archive.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Batch {
    /// Unique batch identifier.
    pub batch_id: String,
    /// Opaque Blob key for the uploaded archive.
    pub archive_key: String,
    /// Alias equal to `batch_id` unless explicitly diverged.
    pub run_id: String,
    /// Current lifecycle state.
    pub state: BatchState,
    /// Non-negative; 0 before expansion completes.
    pub total_files: i64,
    /// Set when the batch itself fails (e.g. expansion found nothing).
    pub error_message: Option<String>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
    /// Set iff `state` is terminal.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Classification of a WorkItem failure, carried at file-attempt scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Transient I/O or Store contention. Retried.
    Retryable,
    /// Extractor exceeded the per-job timeout. Retried.
    Timeout,
    /// LLM rate-limit signal. Retried with an extended floor.
    RateLimit,
    /// LLM call returned an error other than rate-limit. Retried.
    LlmError,
    /// File format could not be parsed. Not retried.
    ParseError,
    /// File missing, unsupported once claimed, credential error. Not retried.
    Permanent,
    /// Unclassifiable. Not retried by default.
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Retryable => "RETRYABLE",
            Self::Timeout => "TIMEOUT",
            Self::RateLimit => "RATE_LIMIT",
            Self::LlmError => "LLM_ERROR",
            Self::ParseError => "PARSE_ERROR",
            Self::Permanent => "PERMANENT",
            Self::Unknown => "UNKNOWN",
        };
        write!(f, "{s}")
    }
}

impl ErrorKind {
    /// Whether an attempt classified with this kind should be retried
    /// (subject to `retry_count < max_retry_attempts`).
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Retryable | Self::Timeout | Self::RateLimit | Self::LlmError
        )
    }
}

/// Lifecycle state of a [`WorkItem`] attempt. Terminal states are absorbing
/// with respect to a given attempt; a requeue materialises as a new attempt
/// that resets state to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkItemState {
    /// Waiting to be claimed.
    Pending,
    /// Claimed by a consume routine; `started_at` set.
    Processing,
    /// Terminal: extraction succeeded; `extracted` is non-null.
    Success,
    /// Terminal: extraction failed permanently (for this attempt).
    Failed,
    /// Terminal: file recognised but intentionally not processed.
    Skipped,
}

impl std::fmt::Display for WorkItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        };
        write!(f, "{s}")
    }
}

/// One document inside a Batch scheduled for extraction.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkItem {
    /// Globally unique document identifier.
    pub doc_id: String,
    /// Foreign key to `Batch.run_id`.
    pub run_id: String,
    /// Original file name.
    pub filename: String,
    /// Blob key to the expanded file.
    pub file_key: String,
    /// Detected file type (from extension).
    pub file_type: String,
    /// Current attempt state.
    pub state: WorkItemState,
    /// Opaque extracted JSON; set only on `Success`.
    pub extracted: Option<serde_json::Value>,
    /// Human-readable error text; set only on `Failed`.
    pub error_text: Option<String>,
    /// Classification; non-null iff `state == Failed`.
    pub error_kind: Option<ErrorKind>,
    /// Number of attempts that preceded the current one.
    pub retry_count: i32,
    /// Set when the current attempt was claimed.
    pub started_at: Option<DateTime<Utc>>,
    /// Set when the current attempt reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}

impl WorkItem {
    /// `completed_at − started_at` in milliseconds, when both are set.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.completed_at) {
            (Some(started), Some(completed)) => {
                Some((completed - started).num_milliseconds())
            }
            _ => None,
        }
    }
}

/// Per-batch counts used for progress reporting and quiescence detection.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Total WorkItems created for the batch.
    pub total: i64,
    /// WorkItems currently `Pending`.
    pub pending: i64,
    /// WorkItems currently `Processing`.
    pub processing: i64,
    /// WorkItems in terminal state `Success`.
    pub success: i64,
    /// WorkItems in terminal state `Failed`.
    pub failed: i64,
    /// Most recent `completed_at` across all WorkItems, if any completed.
    pub last_completed_at: Option<DateTime<Utc>>,
}

impl BatchStats {
    /// `100 * (success + failed) / total`, or 0 when `total == 0`.
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            100.0 * f64::from(i32::try_from(self.success + self.failed).unwrap_or(i32::MAX))
                / f64::from(i32::try_from(self.total).unwrap_or(i32::MAX))
        }
    }

    /// The quiescence condition from the Finalizer contract: no items in
    /// flight and every item has reached a terminal state.
    pub const fn is_quiescent(&self) -> bool {
        self.total > 0
            && self.pending == 0
            && self.processing == 0
            && self.success + self.failed >= self.total
    }
}

/// Merged per-batch summary document, produced exactly once by the
/// Aggregator.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Summary {
    /// Unique per batch; foreign key to `Batch.run_id`.
    pub run_id: String,
    /// Opaque merged document.
    pub ui_json: serde_json::Value,
    /// Total WorkItems at summary creation time.
    pub total_files: i64,
    /// WorkItems that reached `Success`.
    pub success_files: i64,
    /// WorkItems that reached `Failed`.
    pub failed_files: i64,
    /// Mirrors the owning batch's terminal state.
    pub state: BatchState,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time (idempotent upserts bump this).
    pub updated_at: DateTime<Utc>,
}

/// Operational severity for [`Alert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    /// Requires operator attention now.
    Critical,
    /// Notable but not urgent.
    Warning,
    /// Informational only.
    Info,
}

/// An operational alert. Writing one never changes lifecycle behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Alert {
    /// Alert identifier.
    pub id: i64,
    /// Machine-readable kind, e.g. `"WORKER_UNREACHABLE"`.
    pub kind: String,
    /// Severity.
    pub severity: AlertSeverity,
    /// Human-readable message.
    pub message: String,
    /// Opaque structured context.
    pub context: serde_json::Value,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Set once an operator resolves the alert.
    pub resolved_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_state_terminality() {
        assert!(BatchState::Completed.is_terminal());
        assert!(BatchState::CompletedWithErrors.is_terminal());
        assert!(BatchState::Failed.is_terminal());
        assert!(!BatchState::Queued.is_terminal());
        assert!(!BatchState::Extracting.is_terminal());
        assert!(!BatchState::Processing.is_terminal());
    }

    #[test]
    fn error_kind_retry_disposition_matches_taxonomy() {
        assert!(ErrorKind::Retryable.is_retryable());
        assert!(ErrorKind::Timeout.is_retryable());
        assert!(ErrorKind::RateLimit.is_retryable());
        assert!(ErrorKind::LlmError.is_retryable());
        assert!(!ErrorKind::ParseError.is_retryable());
        assert!(!ErrorKind::Permanent.is_retryable());
        assert!(!ErrorKind::Unknown.is_retryable());
    }

    #[test]
    fn batch_stats_quiescence_requires_total_greater_than_zero() {
        let empty = BatchStats::default();
        assert!(!empty.is_quiescent());

        let quiescent = BatchStats {
            total: 3,
            pending: 0,
            processing: 0,
            success: 2,
            failed: 1,
            last_completed_at: Some(Utc::now()),
        };
        assert!(quiescent.is_quiescent());

        let still_processing = BatchStats {
            total: 3,
            pending: 0,
            processing: 1,
            success: 2,
            failed: 0,
            last_completed_at: None,
        };
        assert!(!still_processing.is_quiescent());
    }

    #[test]
    fn batch_stats_progress_percent_zero_when_total_zero() {
        let stats = BatchStats::default();
        assert!((stats.progress_percent() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn work_item_duration_requires_both_timestamps() {
        let mut item = WorkItem {
            doc_id: "d".into(),
            run_id: "r".into(),
            filename: "f.pdf".into(),
            file_key: "extracted/r/f.pdf".into(),
            file_type: "pdf".into(),
            state: WorkItemState::Processing,
            extracted: None,
            error_text: None,
            error_kind: None,
            retry_count: 0,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        };
        assert_eq!(item.duration_ms(), None);

        let started = Utc::now();
        item.started_at = Some(started);
        item.completed_at = Some(started + chrono::Duration::milliseconds(250));
        assert_eq!(item.duration_ms(), Some(250));
    }
}
