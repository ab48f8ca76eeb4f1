//! The reap tick: the state-driven safety net. Runs on a timer, independent
//! of any consume routine, and closes the race where the last file's
//! terminal write lands but no further job arrives to trigger event-driven
//! finalization.

use chrono::Duration as ChronoDuration;
use tender_queue::Queue;
use tender_store::Store;

use crate::error::WorkerResult;
use crate::finalizer::finalize;

/// Run one reap tick: promote due delayed envelopes, then finalize every
/// batch that has gone quiescent.
pub async fn reap_tick(store: &dyn Store, queue: &dyn Queue, quiescent_idle_ms: u64) -> WorkerResult<()> {
    let promoted = queue.promote_due().await?;
    if promoted > 0 {
        tracing::debug!(promoted, "promoted due delayed envelopes");
    }

    let idle_for = ChronoDuration::milliseconds(i64::try_from(quiescent_idle_ms).unwrap_or(i64::MAX));
    let quiescent = store.find_quiescent_batches(idle_for).await?;
    for batch in &quiescent {
        match finalize(&batch.batch_id, store, queue).await {
            Ok(outcome) => tracing::debug!(batch_id = %batch.batch_id, ?outcome, "reap tick finalized batch"),
            Err(err) => tracing::error!(batch_id = %batch.batch_id, error = %err, "reap tick finalize failed"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tender_queue::MockQueue;
    use tender_store::{BatchState, MockStore};

    #[tokio::test]
    async fn promotes_due_envelopes_and_finalizes_quiescent_batches() {
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

        reap_tick(&store, &queue, 0).await.unwrap();

        let batch = store.get_batch("b1").await.unwrap().unwrap();
        assert_eq!(batch.state, BatchState::Completed);
    }
}
