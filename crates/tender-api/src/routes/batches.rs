//! The core HTTP surface (§4.8): upload a batch, trigger expansion,
//! poll progress, and read the merged summary.

use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Response};
use axum::http::StatusCode;
use axum::{Json, Router};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use tender_store::BatchStats;
use tender_worker::{finalize, FinalizeOutcome};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/batches", post(create_batch))
        .route("/batches/{id}/process", post(process_batch))
        .route("/batches/{id}/status", get(get_status))
        .route("/batches/{id}/summary", get(get_summary))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateBatchResponse {
    pub batch_id: String,
}

/// `POST /batches` — upload an archive as multipart form data under field
/// `archive`. Validates the upload is a zip by magic bytes and enforces
/// `max_file_size_bytes`.
async fn create_batch(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<Json<CreateBatchResponse>> {
    let mut archive_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::Validation(e.to_string()))? {
        if field.name() == Some("archive") {
            let bytes = field.bytes().await.map_err(|e| ApiError::Validation(e.to_string()))?;
            archive_bytes = Some(bytes.to_vec());
        }
    }

    let bytes = archive_bytes.ok_or_else(|| ApiError::Validation("missing \"archive\" field".to_string()))?;

    if bytes.len() as u64 > state.max_file_size_bytes {
        return Err(ApiError::Validation(format!(
            "archive exceeds max_file_size_bytes ({})",
            state.max_file_size_bytes
        )));
    }
    if !is_zip(&bytes) {
        return Err(ApiError::Validation("upload is not a zip archive".to_string()));
    }

    let batch_id = Uuid::new_v4().to_string();
    let archive_key = format!("uploads/{batch_id}/archive.zip");
    state.blob.put(&archive_key, bytes).await?;
    state.store.create_batch(&batch_id, &archive_key, None).await?;

    Ok(Json(CreateBatchResponse { batch_id }))
}

fn is_zip(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && bytes[0] == 0x50 && bytes[1] == 0x4b && (bytes[2] == 0x03 || bytes[2] == 0x05 || bytes[2] == 0x07)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessBatchResponse {
    pub success: bool,
}

/// `POST /batches/{id}/process` — idempotent; kicks off archive expansion
/// in the background and returns immediately.
async fn process_batch(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    state.store.get_batch(&id).await?.ok_or_else(|| ApiError::NotFound(id.clone()))?;

    if !state.allow_process_trigger(&id) {
        return Err(ApiError::RateLimited(format!(
            "process already triggered recently for batch {id}"
        )));
    }

    let store = state.store.clone();
    let blob = state.blob.clone();
    let queue = state.queue.clone();
    let config = state.expander_config.clone();
    tokio::spawn(async move {
        if let Err(err) = tender_expander::expand_batch(&id, store.as_ref(), blob.as_ref(), queue.as_ref(), &config).await {
            tracing::error!(batch_id = %id, error = %err, "expansion failed");
        }
    });

    Ok((StatusCode::ACCEPTED, Json(ProcessBatchResponse { success: true })).into_response())
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub total: i64,
    pub pending: i64,
    pub processing: i64,
    pub success: i64,
    pub failed: i64,
    pub progress_percent: f64,
}

impl From<BatchStats> for StatusResponse {
    fn from(stats: BatchStats) -> Self {
        Self {
            total: stats.total,
            pending: stats.pending,
            processing: stats.processing,
            success: stats.success,
            failed: stats.failed,
            progress_percent: stats.progress_percent(),
        }
    }
}

/// `GET /batches/{id}/status`.
async fn get_status(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<StatusResponse>> {
    state.store.get_batch(&id).await?.ok_or_else(|| ApiError::NotFound(id.clone()))?;
    let stats = state.store.batch_stats(&id).await?;
    Ok(Json(stats.into()))
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryAfterResponse {
    pub retry_after: u64,
}

/// `GET /batches/{id}/summary` — 200 with the Summary if it exists; 202 if
/// the batch just went quiescent and aggregation was (re-)scheduled; 404 if
/// the batch is unknown.
async fn get_summary(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Response> {
    state.store.get_batch(&id).await?.ok_or_else(|| ApiError::NotFound(id.clone()))?;

    if let Some(summary) = state.store.get_summary(&id).await? {
        return Ok((StatusCode::OK, Json(summary)).into_response());
    }

    match finalize(&id, state.store.as_ref(), state.queue.as_ref()).await? {
        FinalizeOutcome::NotQuiescent => Err(ApiError::NotFound(id)),
        FinalizeOutcome::AlreadyDone | FinalizeOutcome::AggregationRequeued | FinalizeOutcome::Finalized(_) => {
            Ok((StatusCode::ACCEPTED, Json(RetryAfterResponse { retry_after: 5 })).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_magic_bytes_are_recognised() {
        assert!(is_zip(&[0x50, 0x4b, 0x03, 0x04]));
        assert!(is_zip(&[0x50, 0x4b, 0x05, 0x06]));
        assert!(!is_zip(b"not a zip"));
        assert!(!is_zip(&[0x50]));
    }
}
