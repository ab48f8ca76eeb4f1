//! The Finalizer: the guarded transition from non-terminal to terminal
//! batch state, plus aggregation scheduling. Invoked by three coequal
//! drivers — the consume loop after each file, the reap tick for quiescent
//! batches, and the API on a summary read — all converging on this single
//! idempotent function.

use tender_queue::{Envelope, Queue};
use tender_store::{BatchState, Store};

use crate::error::WorkerResult;

/// What happened in one `finalize` call, surfaced for logging/tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// Batch was already terminal and had a Summary; nothing to do.
    AlreadyDone,
    /// Batch was already terminal but lacked a Summary; aggregation was
    /// (re-)enqueued.
    AggregationRequeued,
    /// Batch is not yet quiescent; nothing to do.
    NotQuiescent,
    /// This call applied the terminal transition and scheduled aggregation.
    Finalized(BatchState),
}

/// Run the Finalizer algorithm for `batch_id`.
///
/// # Errors
/// Returns [`crate::error::WorkerError`] if Store or Queue access fails.
/// Enqueue failures after a successful transition are logged, not
/// propagated: the transition must stand regardless (§4.6 step 6).
pub async fn finalize(batch_id: &str, store: &dyn Store, queue: &dyn Queue) -> WorkerResult<FinalizeOutcome> {
    let batch = store
        .get_batch(batch_id)
        .await?
        .ok_or_else(|| crate::error::WorkerError::Store(format!("batch {batch_id} not found")))?;

    if batch.state.is_terminal() {
        return if store.get_summary(batch_id).await?.is_some() {
            Ok(FinalizeOutcome::AlreadyDone)
        } else {
            enqueue_aggregation(batch_id, store, queue).await?;
            Ok(FinalizeOutcome::AggregationRequeued)
        };
    }

    let stats = store.batch_stats(batch_id).await?;
    if !stats.is_quiescent() {
        return Ok(FinalizeOutcome::NotQuiescent);
    }

    let next_state = if stats.failed == 0 { BatchState::Completed } else { BatchState::CompletedWithErrors };

    let applied = store
        .transition_batch(batch_id, &[BatchState::Processing, BatchState::Queued], next_state, None)
        .await?;

    if !applied {
        // Lost the race to a concurrent Finalizer invocation.
        return Ok(FinalizeOutcome::NotQuiescent);
    }

    enqueue_aggregation(batch_id, store, queue).await?;
    Ok(FinalizeOutcome::Finalized(next_state))
}

async fn enqueue_aggregation(batch_id: &str, store: &dyn Store, queue: &dyn Queue) -> WorkerResult<()> {
    if store.get_summary(batch_id).await?.is_some() {
        return Ok(());
    }
    if let Err(err) = queue.enqueue(&Envelope::aggregate_batch(batch_id.to_string())).await {
        tracing::warn!(batch_id, error = %err, "failed to enqueue aggregate_batch; relying on reap tick or API path to retry");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tender_queue::MockQueue;
    use tender_store::{MockStore, SummaryCounts};

    #[tokio::test]
    async fn not_quiescent_leaves_batch_untouched() {
        let store = MockStore::new();
        let queue = MockQueue::new();
        store.create_batch("b1", "uploads/b1/a.zip", None).await.unwrap();
        store.set_batch_total_files("b1", 2).await.unwrap();

        let outcome = finalize("b1", &store, &queue).await.unwrap();
        assert_eq!(outcome, FinalizeOutcome::NotQuiescent);
    }

    #[tokio::test]
    async fn quiescent_batch_transitions_and_enqueues_aggregation() {
        let store = MockStore::new();
        let queue = MockQueue::new();
        store.create_batch("b1", "uploads/b1/a.zip", None).await.unwrap();
        store
            .transition_batch("b1", &[BatchState::Queued], BatchState::Processing, None)
            .await
            .unwrap();
        store.set_batch_total_files("b1", 1).await.unwrap();
        store.create_work_item("b1", "d1", "a.pdf", "extracted/b1/a.pdf", "pdf").await.unwrap();
        store.claim_work_item("d1").await.unwrap();
        store.mark_work_item_success("d1", serde_json::json!({})).await.unwrap();

        let outcome = finalize("b1", &store, &queue).await.unwrap();
        assert_eq!(outcome, FinalizeOutcome::Finalized(BatchState::Completed));

        let metrics = queue.metrics().await.unwrap();
        assert_eq!(metrics.queue_length, 1);
    }

    #[tokio::test]
    async fn terminal_batch_with_existing_summary_is_already_done() {
        let store = MockStore::new();
        let queue = MockQueue::new();
        store.create_batch("b1", "uploads/b1/a.zip", None).await.unwrap();
        store
            .transition_batch("b1", &[BatchState::Queued], BatchState::Completed, None)
            .await
            .unwrap();
        store
            .upsert_summary(
                "b1",
                serde_json::json!({}),
                SummaryCounts { total: 0, success: 0, failed: 0 },
                BatchState::Completed,
            )
            .await
            .unwrap();

        let outcome = finalize("b1", &store, &queue).await.unwrap();
        assert_eq!(outcome, FinalizeOutcome::AlreadyDone);
    }
}
