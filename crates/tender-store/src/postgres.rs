//! `PostgreSQL`-backed implementation of [`Store`].

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};

use crate::error::{StoreError, StoreResult};
use crate::models::{Alert, AlertSeverity, Batch, BatchState, BatchStats, ErrorKind, Summary, WorkItem};
use crate::pool::PoolManager;
use crate::traits::{Store, SummaryCounts};

/// `PostgreSQL` implementation of [`Store`], using separate write and read
/// pools. All conditional state transitions rely on `WHERE` clauses over
/// the current row rather than an application-held lock.
#[derive(Clone)]
pub struct PgStore {
    pools: PoolManager,
}

impl PgStore {
    /// Wrap an already-connected [`PoolManager`].
    pub const fn new(pools: PoolManager) -> Self {
        Self { pools }
    }

    fn writer(&self) -> &PgPool {
        self.pools.write_pool()
    }

    fn reader(&self) -> &PgPool {
        self.pools.read_pool()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_batch(
        &self,
        batch_id: &str,
        archive_key: &str,
        uploaded_by: Option<&str>,
    ) -> StoreResult<Batch> {
        tracing::debug!(batch_id, "create_batch");

        let batch = sqlx::query_as::<_, Batch>(
            r"
            INSERT INTO batches (batch_id, archive_key, run_id, state, uploaded_by)
            VALUES ($1, $2, $1, 'QUEUED', $3)
            ON CONFLICT (batch_id) DO NOTHING
            RETURNING batch_id, archive_key, run_id, state, total_files,
                      error_message, created_at, updated_at, completed_at
            ",
        )
        .bind(batch_id)
        .bind(archive_key)
        .bind(uploaded_by)
        .fetch_optional(self.writer())
        .await?;

        batch.ok_or_else(|| StoreError::AlreadyExists(batch_id.to_string()))
    }

    async fn transition_batch(
        &self,
        batch_id: &str,
        from: &[BatchState],
        to: BatchState,
        error: Option<&str>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE batches
            SET state = $2,
                error_message = COALESCE($3, error_message),
                completed_at = CASE WHEN $4 THEN now() ELSE completed_at END,
                updated_at = now()
            WHERE batch_id = $1 AND state = ANY($5)
            ",
        )
        .bind(batch_id)
        .bind(to)
        .bind(error)
        .bind(to.is_terminal())
        .bind(from)
        .execute(self.writer())
        .await?;

        let applied = result.rows_affected() > 0;
        if !applied {
            tracing::warn!(batch_id, ?from, to = %to, "transition_batch did not apply");
        }
        Ok(applied)
    }

    async fn set_batch_total_files(&self, batch_id: &str, n: i64) -> StoreResult<()> {
        sqlx::query(
            r"
            UPDATE batches
            SET total_files = $2, updated_at = now()
            WHERE batch_id = $1 AND state = 'EXTRACTING'
            ",
        )
        .bind(batch_id)
        .bind(n)
        .execute(self.writer())
        .await?;
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
        let inserted = sqlx::query_as::<_, WorkItem>(
            r"
            INSERT INTO work_items (doc_id, run_id, filename, file_key, file_type, state)
            VALUES ($1, $2, $3, $4, $5, 'PENDING')
            ON CONFLICT (doc_id) DO NOTHING
            RETURNING doc_id, run_id, filename, file_key, file_type, state,
                      extracted, error_text, error_kind, retry_count,
                      started_at, completed_at, created_at
            ",
        )
        .bind(doc_id)
        .bind(run_id)
        .bind(filename)
        .bind(file_key)
        .bind(file_type)
        .fetch_optional(self.writer())
        .await?;

        if let Some(item) = inserted {
            return Ok((item, true));
        }

        let existing = sqlx::query_as::<_, WorkItem>(
            r"SELECT doc_id, run_id, filename, file_key, file_type, state,
                      extracted, error_text, error_kind, retry_count,
                      started_at, completed_at, created_at
               FROM work_items WHERE doc_id = $1",
        )
        .bind(doc_id)
        .fetch_one(self.writer())
        .await?;

        Ok((existing, false))
    }

    async fn claim_work_item(&self, doc_id: &str) -> StoreResult<WorkItem> {
        let claimed = sqlx::query_as::<_, WorkItem>(
            r"
            UPDATE work_items
            SET state = 'PROCESSING', started_at = now()
            WHERE doc_id = $1 AND state = 'PENDING'
            RETURNING doc_id, run_id, filename, file_key, file_type, state,
                      extracted, error_text, error_kind, retry_count,
                      started_at, completed_at, created_at
            ",
        )
        .bind(doc_id)
        .fetch_optional(self.writer())
        .await?;

        if let Some(item) = claimed {
            return Ok(item);
        }

        let current = sqlx::query_as::<_, WorkItem>(
            r"SELECT doc_id, run_id, filename, file_key, file_type, state,
                      extracted, error_text, error_kind, retry_count,
                      started_at, completed_at, created_at
               FROM work_items WHERE doc_id = $1",
        )
        .bind(doc_id)
        .fetch_optional(self.writer())
        .await?;

        match current {
            Some(item) => Err(StoreError::NotClaimable(item.state.to_string())),
            None => Err(StoreError::NotFound(doc_id.to_string())),
        }
    }

    async fn mark_work_item_success(
        &self,
        doc_id: &str,
        extracted: serde_json::Value,
    ) -> StoreResult<()> {
        sqlx::query(
            r"
            UPDATE work_items
            SET state = 'SUCCESS', completed_at = now(), extracted = $2
            WHERE doc_id = $1
            ",
        )
        .bind(doc_id)
        .bind(extracted)
        .execute(self.writer())
        .await?;
        Ok(())
    }

    async fn mark_work_item_failed(
        &self,
        doc_id: &str,
        error_kind: ErrorKind,
        error_text: &str,
    ) -> StoreResult<()> {
        sqlx::query(
            r"
            UPDATE work_items
            SET state = 'FAILED', completed_at = now(), error_kind = $2, error_text = $3
            WHERE doc_id = $1
            ",
        )
        .bind(doc_id)
        .bind(error_kind)
        .bind(error_text)
        .execute(self.writer())
        .await?;
        Ok(())
    }

    async fn prepare_retry(&self, doc_id: &str) -> StoreResult<()> {
        sqlx::query(
            r"
            UPDATE work_items
            SET state = 'PENDING',
                retry_count = retry_count + 1,
                started_at = NULL,
                completed_at = NULL,
                error_text = NULL,
                error_kind = NULL
            WHERE doc_id = $1
            ",
        )
        .bind(doc_id)
        .execute(self.writer())
        .await?;
        Ok(())
    }

    async fn batch_stats(&self, batch_id: &str) -> StoreResult<BatchStats> {
        let row = sqlx::query(
            r"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE wi.state = 'PENDING') AS pending,
                COUNT(*) FILTER (WHERE wi.state = 'PROCESSING') AS processing,
                COUNT(*) FILTER (WHERE wi.state = 'SUCCESS') AS success,
                COUNT(*) FILTER (WHERE wi.state = 'FAILED') AS failed,
                MAX(wi.completed_at) AS last_completed_at
            FROM work_items wi
            JOIN batches b ON wi.run_id = COALESCE(b.run_id, b.batch_id)
            WHERE b.batch_id = $1
            ",
        )
        .bind(batch_id)
        .fetch_one(self.reader())
        .await?;

        Ok(BatchStats {
            total: row.try_get("total")?,
            pending: row.try_get("pending")?,
            processing: row.try_get("processing")?,
            success: row.try_get("success")?,
            failed: row.try_get("failed")?,
            last_completed_at: row.try_get("last_completed_at")?,
        })
    }

    async fn upsert_summary(
        &self,
        run_id: &str,
        ui_json: serde_json::Value,
        counts: SummaryCounts,
        state: BatchState,
    ) -> StoreResult<Summary> {
        let summary = sqlx::query_as::<_, Summary>(
            r"
            INSERT INTO summaries (run_id, ui_json, total_files, success_files, failed_files, state)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (run_id) DO UPDATE SET
                ui_json = EXCLUDED.ui_json,
                total_files = EXCLUDED.total_files,
                success_files = EXCLUDED.success_files,
                failed_files = EXCLUDED.failed_files,
                state = EXCLUDED.state,
                updated_at = now()
            RETURNING run_id, ui_json, total_files, success_files, failed_files,
                      state, created_at, updated_at
            ",
        )
        .bind(run_id)
        .bind(ui_json)
        .bind(counts.total)
        .bind(counts.success)
        .bind(counts.failed)
        .bind(state)
        .fetch_one(self.writer())
        .await?;

        Ok(summary)
    }

    async fn get_summary(&self, run_id: &str) -> StoreResult<Option<Summary>> {
        let summary = sqlx::query_as::<_, Summary>(
            r"SELECT run_id, ui_json, total_files, success_files, failed_files,
                      state, created_at, updated_at
               FROM summaries WHERE run_id = $1",
        )
        .bind(run_id)
        .fetch_optional(self.reader())
        .await?;
        Ok(summary)
    }

    async fn get_batch(&self, batch_id: &str) -> StoreResult<Option<Batch>> {
        let batch = sqlx::query_as::<_, Batch>(
            r"SELECT batch_id, archive_key, run_id, state, total_files,
                      error_message, created_at, updated_at, completed_at
               FROM batches WHERE batch_id = $1",
        )
        .bind(batch_id)
        .fetch_optional(self.reader())
        .await?;
        Ok(batch)
    }

    async fn get_success_work_items(&self, batch_id: &str) -> StoreResult<Vec<WorkItem>> {
        let items = sqlx::query_as::<_, WorkItem>(
            r"
            SELECT doc_id, run_id, filename, file_key, file_type, state,
                   extracted, error_text, error_kind, retry_count,
                   started_at, completed_at, created_at
            FROM work_items
            WHERE run_id = $1 AND state = 'SUCCESS'
            ORDER BY completed_at ASC, doc_id ASC
            ",
        )
        .bind(batch_id)
        .fetch_all(self.reader())
        .await?;
        Ok(items)
    }

    async fn find_quiescent_batches(&self, idle_for: Duration) -> StoreResult<Vec<Batch>> {
        let threshold: DateTime<Utc> = Utc::now() - idle_for;

        let batches = sqlx::query_as::<_, Batch>(
            r"
            SELECT b.batch_id, b.archive_key, b.run_id, b.state, b.total_files,
                   b.error_message, b.created_at, b.updated_at, b.completed_at
            FROM batches b
            JOIN (
                SELECT run_id,
                       COUNT(*) AS total,
                       COUNT(*) FILTER (WHERE state = 'PENDING') AS pending,
                       COUNT(*) FILTER (WHERE state = 'PROCESSING') AS processing,
                       COUNT(*) FILTER (WHERE state = 'SUCCESS') AS success,
                       COUNT(*) FILTER (WHERE state = 'FAILED') AS failed,
                       MAX(completed_at) AS last_completed_at
                FROM work_items
                GROUP BY run_id
            ) s ON s.run_id = COALESCE(b.run_id, b.batch_id)
            WHERE b.state = 'PROCESSING'
              AND s.pending = 0
              AND s.processing = 0
              AND s.success + s.failed >= s.total
              AND s.last_completed_at < $1
            ",
        )
        .bind(threshold)
        .fetch_all(self.reader())
        .await?;

        Ok(batches)
    }

    async fn create_alert(
        &self,
        kind: &str,
        severity: AlertSeverity,
        message: &str,
        context: serde_json::Value,
    ) -> StoreResult<Alert> {
        let alert = sqlx::query_as::<_, Alert>(
            r"
            INSERT INTO alerts (kind, severity, message, context)
            VALUES ($1, $2, $3, $4)
            RETURNING id, kind, severity, message, context, created_at, resolved_at
            ",
        )
        .bind(kind)
        .bind(severity)
        .bind(message)
        .bind(context)
        .fetch_one(self.writer())
        .await?;
        Ok(alert)
    }
}
