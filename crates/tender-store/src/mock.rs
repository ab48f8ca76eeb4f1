//! In-memory [`Store`] double for tests that don't need a real database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::error::{StoreError, StoreResult};
use crate::models::{
    Alert, AlertSeverity, Batch, BatchState, BatchStats, ErrorKind, Summary, WorkItem, WorkItemState,
};
use crate::traits::{Store, SummaryCounts};

#[derive(Default)]
struct Inner {
    batches: HashMap<String, Batch>,
    work_items: HashMap<String, WorkItem>,
    summaries: HashMap<String, Summary>,
    alerts: Vec<Alert>,
    next_alert_id: i64,
}

/// `Mutex`-guarded in-memory [`Store`]. Single-process only; intended for
/// unit and integration tests, never production use.
#[derive(Default)]
pub struct MockStore {
    inner: Mutex<Inner>,
}

impl MockStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MockStore {
    async fn create_batch(
        &self,
        batch_id: &str,
        archive_key: &str,
        _uploaded_by: Option<&str>,
    ) -> StoreResult<Batch> {
        let mut inner = self.inner.lock().unwrap();
        if inner.batches.contains_key(batch_id) {
            return Err(StoreError::AlreadyExists(batch_id.to_string()));
        }
        let now = Utc::now();
        let batch = Batch {
            batch_id: batch_id.to_string(),
            archive_key: archive_key.to_string(),
            run_id: batch_id.to_string(),
            state: BatchState::Queued,
            total_files: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        inner.batches.insert(batch_id.to_string(), batch.clone());
        Ok(batch)
    }

    async fn transition_batch(
        &self,
        batch_id: &str,
        from: &[BatchState],
        to: BatchState,
        error: Option<&str>,
    ) -> StoreResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        let Some(batch) = inner.batches.get_mut(batch_id) else {
            return Ok(false);
        };
        if !from.contains(&batch.state) {
            return Ok(false);
        }
        batch.state = to;
        if let Some(msg) = error {
            batch.error_message = Some(msg.to_string());
        }
        if to.is_terminal() {
            batch.completed_at = Some(Utc::now());
        }
        batch.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_batch_total_files(&self, batch_id: &str, n: i64) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(batch) = inner.batches.get_mut(batch_id) {
            if batch.state == BatchState::Extracting {
                batch.total_files = n;
                batch.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn create_work_item(
        &self,
        run_id: &str,
        doc_id: &str,
        filename: &str,
        file_key: &str,
        file_type: &str,
    ) -> StoreResult<(WorkItem, bool)> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.work_items.get(doc_id) {
            return Ok((existing.clone(), false));
        }
        let item = WorkItem {
            doc_id: doc_id.to_string(),
            run_id: run_id.to_string(),
            filename: filename.to_string(),
            file_key: file_key.to_string(),
            file_type: file_type.to_string(),
            state: WorkItemState::Pending,
            extracted: None,
            error_text: None,
            error_kind: None,
            retry_count: 0,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        };
        inner.work_items.insert(doc_id.to_string(), item.clone());
        Ok((item, true))
    }

    async fn claim_work_item(&self, doc_id: &str) -> StoreResult<WorkItem> {
        let mut inner = self.inner.lock().unwrap();
        let item = inner
            .work_items
            .get_mut(doc_id)
            .ok_or_else(|| StoreError::NotFound(doc_id.to_string()))?;
        if item.state != WorkItemState::Pending {
            return Err(StoreError::NotClaimable(item.state.to_string()));
        }
        item.state = WorkItemState::Processing;
        item.started_at = Some(Utc::now());
        Ok(item.clone())
    }

    async fn mark_work_item_success(
        &self,
        doc_id: &str,
        extracted: serde_json::Value,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(item) = inner.work_items.get_mut(doc_id) {
            item.state = WorkItemState::Success;
            item.extracted = Some(extracted);
            item.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_work_item_failed(
        &self,
        doc_id: &str,
        error_kind: ErrorKind,
        error_text: &str,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(item) = inner.work_items.get_mut(doc_id) {
            item.state = WorkItemState::Failed;
            item.error_kind = Some(error_kind);
            item.error_text = Some(error_text.to_string());
            item.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn prepare_retry(&self, doc_id: &str) -> StoreResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(item) = inner.work_items.get_mut(doc_id) {
            item.state = WorkItemState::Pending;
            item.retry_count += 1;
            item.started_at = None;
            item.completed_at = None;
            item.error_text = None;
            item.error_kind = None;
        }
        Ok(())
    }

    async fn batch_stats(&self, batch_id: &str) -> StoreResult<BatchStats> {
        let inner = self.inner.lock().unwrap();
        let Some(batch) = inner.batches.get(batch_id) else {
            return Ok(BatchStats::default());
        };
        let mut stats = BatchStats::default();
        for item in inner.work_items.values().filter(|wi| wi.run_id == batch.run_id) {
            stats.total += 1;
            match item.state {
                WorkItemState::Pending => stats.pending += 1,
                WorkItemState::Processing => stats.processing += 1,
                WorkItemState::Success => {
                    stats.success += 1;
                    stats.last_completed_at = max_opt(stats.last_completed_at, item.completed_at);
                }
                WorkItemState::Failed => {
                    stats.failed += 1;
                    stats.last_completed_at = max_opt(stats.last_completed_at, item.completed_at);
                }
                WorkItemState::Skipped => {}
            }
        }
        Ok(stats)
    }

    async fn upsert_summary(
        &self,
        run_id: &str,
        ui_json: serde_json::Value,
        counts: SummaryCounts,
        state: BatchState,
    ) -> StoreResult<Summary> {
        let mut inner = self.inner.lock().unwrap();
        let now = Utc::now();
        let created_at = inner
            .summaries
            .get(run_id)
            .map_or(now, |existing| existing.created_at);
        let summary = Summary {
            run_id: run_id.to_string(),
            ui_json,
            total_files: counts.total,
            success_files: counts.success,
            failed_files: counts.failed,
            state,
            created_at,
            updated_at: now,
        };
        inner.summaries.insert(run_id.to_string(), summary.clone());
        Ok(summary)
    }

    async fn get_summary(&self, run_id: &str) -> StoreResult<Option<Summary>> {
        Ok(self.inner.lock().unwrap().summaries.get(run_id).cloned())
    }

    async fn get_batch(&self, batch_id: &str) -> StoreResult<Option<Batch>> {
        Ok(self.inner.lock().unwrap().batches.get(batch_id).cloned())
    }

    async fn get_success_work_items(&self, batch_id: &str) -> StoreResult<Vec<WorkItem>> {
        let inner = self.inner.lock().unwrap();
        let Some(batch) = inner.batches.get(batch_id) else {
            return Ok(Vec::new());
        };
        let mut items: Vec<WorkItem> = inner
            .work_items
            .values()
            .filter(|wi| wi.run_id == batch.run_id && wi.state == WorkItemState::Success)
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            a.completed_at
                .cmp(&b.completed_at)
                .then_with(|| a.doc_id.cmp(&b.doc_id))
        });
        Ok(items)
    }

    async fn find_quiescent_batches(&self, idle_for: Duration) -> StoreResult<Vec<Batch>> {
        let inner = self.inner.lock().unwrap();
        let threshold = Utc::now() - idle_for;
        let mut result = Vec::new();
        for batch in inner.batches.values() {
            if batch.state != BatchState::Processing {
                continue;
            }
            let stats = {
                let mut s = BatchStats::default();
                for item in inner.work_items.values().filter(|wi| wi.run_id == batch.run_id) {
                    s.total += 1;
                    match item.state {
                        WorkItemState::Pending => s.pending += 1,
                        WorkItemState::Processing => s.processing += 1,
                        WorkItemState::Success => {
                            s.success += 1;
                            s.last_completed_at = max_opt(s.last_completed_at, item.completed_at);
                        }
                        WorkItemState::Failed => {
                            s.failed += 1;
                            s.last_completed_at = max_opt(s.last_completed_at, item.completed_at);
                        }
                        WorkItemState::Skipped => {}
                    }
                }
                s
            };
            if stats.is_quiescent() && stats.last_completed_at.is_some_and(|t| t < threshold) {
                result.push(batch.clone());
            }
        }
        Ok(result)
    }

    async fn create_alert(
        &self,
        kind: &str,
        severity: AlertSeverity,
        message: &str,
        context: serde_json::Value,
    ) -> StoreResult<Alert> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_alert_id += 1;
        let alert = Alert {
            id: inner.next_alert_id,
            kind: kind.to_string(),
            severity,
            message: message.to_string(),
            context,
            created_at: Utc::now(),
            resolved_at: None,
        };
        inner.alerts.push(alert.clone());
        Ok(alert)
    }
}

fn max_opt<T: Ord + Copy>(a: Option<T>, b: Option<T>) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_batch_rejects_duplicate_id() {
        let store = MockStore::new();
        store.create_batch("b1", "archive/b1.zip", None).await.unwrap();
        let err = store.create_batch("b1", "archive/b1.zip", None).await;
        assert!(matches!(err, Err(StoreError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn claim_work_item_is_conditional_on_pending() {
        let store = MockStore::new();
        store.create_batch("b1", "archive/b1.zip", None).await.unwrap();
        let (item, created) = store
            .create_work_item("b1", "d1", "a.pdf", "extracted/b1/a.pdf", "pdf")
            .await
            .unwrap();
        assert!(created);
        assert_eq!(item.state, WorkItemState::Pending);

        let claimed = store.claim_work_item("d1").await.unwrap();
        assert_eq!(claimed.state, WorkItemState::Processing);

        let second = store.claim_work_item("d1").await;
        assert!(matches!(second, Err(StoreError::NotClaimable(_))));
    }

    #[tokio::test]
    async fn transition_batch_honors_from_set() {
        let store = MockStore::new();
        store.create_batch("b1", "archive/b1.zip", None).await.unwrap();
        let applied = store
            .transition_batch("b1", &[BatchState::Queued], BatchState::Extracting, None)
            .await
            .unwrap();
        assert!(applied);

        let rejected = store
            .transition_batch("b1", &[BatchState::Queued], BatchState::Failed, None)
            .await
            .unwrap();
        assert!(!rejected);
    }

    #[tokio::test]
    async fn batch_stats_track_terminal_counts() {
        let store = MockStore::new();
        store.create_batch("b1", "archive/b1.zip", None).await.unwrap();
        store
            .create_work_item("b1", "d1", "a.pdf", "k1", "pdf")
            .await
            .unwrap();
        store
            .create_work_item("b1", "d2", "b.pdf", "k2", "pdf")
            .await
            .unwrap();
        store.claim_work_item("d1").await.unwrap();
        store
            .mark_work_item_success("d1", serde_json::json!({"ok": true}))
            .await
            .unwrap();

        let stats = store.batch_stats("b1").await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.success, 1);
        assert_eq!(stats.pending, 1);
        assert!(!stats.is_quiescent());
    }
}
