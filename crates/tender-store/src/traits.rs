//! The `Store` trait: durable state for batches, work items, summaries, and
//! alerts. Every other component mutates state only through these
//! operations; none of them share in-memory state with Store.

use async_trait::async_trait;
use chrono::Duration;

use crate::error::StoreResult;
use crate::models::{Alert, AlertSeverity, Batch, BatchState, BatchStats, ErrorKind, Summary, WorkItem};

/// Counts supplied to [`Store::upsert_summary`].
#[derive(Debug, Clone, Copy)]
pub struct SummaryCounts {
    /// Total WorkItems at summary creation time.
    pub total: i64,
    /// WorkItems that reached `Success`.
    pub success: i64,
    /// WorkItems that reached `Failed`.
    pub failed: i64,
}

/// Durable state: batches, per-file work items, aggregated summaries,
/// alerts. Single source of truth for lifecycle.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new batch row with `state = QUEUED`.
    ///
    /// # Errors
    /// Returns [`crate::error::StoreError::AlreadyExists`] if `batch_id` collides.
    async fn create_batch(
        &self,
        batch_id: &str,
        archive_key: &str,
        uploaded_by: Option<&str>,
    ) -> StoreResult<Batch>;

    /// Atomic conditional update: succeeds only if the current state is in
    /// `from`. Sets `completed_at = now()` when `to` is terminal. Returns
    /// whether the transition was applied.
    async fn transition_batch(
        &self,
        batch_id: &str,
        from: &[BatchState],
        to: BatchState,
        error: Option<&str>,
    ) -> StoreResult<bool>;

    /// Idempotent; allowed only when the batch's current state is
    /// `EXTRACTING`.
    async fn set_batch_total_files(&self, batch_id: &str, n: i64) -> StoreResult<()>;

    /// Insert a WorkItem row. On a `doc_id` conflict, returns the existing
    /// row with `created = false` rather than erroring.
    async fn create_work_item(
        &self,
        run_id: &str,
        doc_id: &str,
        filename: &str,
        file_key: &str,
        file_type: &str,
    ) -> StoreResult<(WorkItem, bool)>;

    /// Conditional claim: if `state == PENDING`, sets `PROCESSING` and
    /// `started_at = now()`, returning the row.
    ///
    /// # Errors
    /// Returns [`crate::error::StoreError::NotClaimable`] if the current state is not
    /// `PENDING`.
    async fn claim_work_item(&self, doc_id: &str) -> StoreResult<WorkItem>;

    /// Mark a WorkItem `SUCCESS`, persisting the extracted JSON and setting
    /// `completed_at = now()`.
    async fn mark_work_item_success(
        &self,
        doc_id: &str,
        extracted: serde_json::Value,
    ) -> StoreResult<()>;

    /// Mark a WorkItem `FAILED`, storing its classification and setting
    /// `completed_at = now()`.
    async fn mark_work_item_failed(
        &self,
        doc_id: &str,
        error_kind: ErrorKind,
        error_text: &str,
    ) -> StoreResult<()>;

    /// Increment `retry_count`, reset `state = PENDING`, clear the
    /// attempt's timestamps.
    async fn prepare_retry(&self, doc_id: &str) -> StoreResult<()>;

    /// Returns aggregate counts for a batch's work items, joined on
    /// `coalesce(batch.run_id, batch.batch_id) = work_item.run_id`.
    async fn batch_stats(&self, batch_id: &str) -> StoreResult<BatchStats>;

    /// Idempotent upsert keyed by `run_id`.
    async fn upsert_summary(
        &self,
        run_id: &str,
        ui_json: serde_json::Value,
        counts: SummaryCounts,
        state: BatchState,
    ) -> StoreResult<Summary>;

    /// Fetch the Summary for a `run_id`, if one exists.
    async fn get_summary(&self, run_id: &str) -> StoreResult<Option<Summary>>;

    /// Fetch a batch by id.
    async fn get_batch(&self, batch_id: &str) -> StoreResult<Option<Batch>>;

    /// Fetch all `SUCCESS` work items for a batch, ordered by
    /// `completed_at` ascending (ties broken by `doc_id`), matching the
    /// Aggregator's merge-stability requirement.
    async fn get_success_work_items(&self, batch_id: &str) -> StoreResult<Vec<WorkItem>>;

    /// Batches whose state is `PROCESSING`, with `pending = processing = 0`,
    /// `success + failed >= total`, and `last_completed_at < now() - idle_for`.
    async fn find_quiescent_batches(&self, idle_for: Duration) -> StoreResult<Vec<Batch>>;

    /// Record an operational alert. Never affects lifecycle state.
    async fn create_alert(
        &self,
        kind: &str,
        severity: AlertSeverity,
        message: &str,
        context: serde_json::Value,
    ) -> StoreResult<Alert>;
}
