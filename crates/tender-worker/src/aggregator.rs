//! The Aggregator: merges every SUCCESS WorkItem's opaque `extracted` JSON
//! for a batch into one Summary document. Preconditions assume the batch is
//! already terminal; this module does not check that itself, matching the
//! Finalizer's division of responsibility.

use tender_store::{BatchStats, Store, SummaryCounts};

use crate::error::WorkerResult;
use crate::merge::{merge_all, MergeItem};

/// Run the Aggregator algorithm for `batch_id`, writing (or refreshing) its
/// Summary row.
///
/// # Errors
/// Returns [`crate::error::WorkerError`] if Store access fails.
pub async fn aggregate(batch_id: &str, store: &dyn Store) -> WorkerResult<()> {
    let batch = store
        .get_batch(batch_id)
        .await?
        .ok_or_else(|| crate::error::WorkerError::Store(format!("batch {batch_id} not found")))?;

    let success_items = store.get_success_work_items(batch_id).await?;
    let stats: BatchStats = store.batch_stats(batch_id).await?;

    let ui_json = if success_items.is_empty() {
        serde_json::json!({})
    } else {
        let merge_items = success_items
            .into_iter()
            .filter_map(|item| {
                let completed_at = item.completed_at?;
                let extracted = item.extracted?;
                Some(MergeItem { value: extracted, order_key: (completed_at, item.doc_id) })
            })
            .collect();
        merge_all(merge_items)
    };

    let counts = SummaryCounts { total: stats.total, success: stats.success, failed: stats.failed };
    store.upsert_summary(batch_id, ui_json, counts, batch.state).await?;

    tracing::info!(batch_id, total = stats.total, success = stats.success, failed = stats.failed, "batch aggregated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tender_store::{BatchState, MockStore};

    #[tokio::test]
    async fn no_success_items_writes_empty_summary() {
        let store = MockStore::new();
        store.create_batch("b1", "uploads/b1/a.zip", None).await.unwrap();
        store
            .transition_batch("b1", &[BatchState::Queued], BatchState::Failed, Some("no files"))
            .await
            .unwrap();

        aggregate("b1", &store).await.unwrap();
        let summary = store.get_summary("b1").await.unwrap().unwrap();
        assert_eq!(summary.ui_json, serde_json::json!({}));
    }

    #[tokio::test]
    async fn merges_success_items_into_summary() {
        let store = MockStore::new();
        store.create_batch("b1", "uploads/b1/a.zip", None).await.unwrap();
        store.set_batch_total_files("b1", 2).await.unwrap();

        store.create_work_item("b1", "d1", "a.pdf", "extracted/b1/a.pdf", "pdf").await.unwrap();
        store.claim_work_item("d1").await.unwrap();
        store.mark_work_item_success("d1", serde_json::json!({"title": "A"})).await.unwrap();

        store.create_work_item("b1", "d2", "b.pdf", "extracted/b1/b.pdf", "pdf").await.unwrap();
        store.claim_work_item("d2").await.unwrap();
        store.mark_work_item_success("d2", serde_json::json!({"title": ""})).await.unwrap();

        store
            .transition_batch("b1", &[BatchState::Queued], BatchState::Completed, None)
            .await
            .unwrap();

        aggregate("b1", &store).await.unwrap();
        let summary = store.get_summary("b1").await.unwrap().unwrap();
        assert_eq!(summary.ui_json["title"], "A");
        assert_eq!(summary.success_files, 2);
    }
}
