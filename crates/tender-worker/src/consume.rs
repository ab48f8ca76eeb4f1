//! The consume loop: one cooperative routine that reserves envelopes,
//! dispatches them by type, and classifies failures into the retry/DLQ
//! policy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tender_config::RetryConfig;
use tender_extraction::{chunk_text, Extractor, Llm};
use tender_queue::{Envelope, Queue};
use tender_store::{ErrorKind, Store};

use crate::aggregator::aggregate;
use crate::backoff::backoff_ms;
use crate::error::WorkerResult;
use crate::finalizer::finalize;
use crate::merge::{merge_all, MergeItem};

const CHUNK_MAX_CHARS: usize = 4_000;

/// Shared handles a consume routine needs. Grouped so spawning N routines
/// doesn't require threading five `Arc` clones through the call site.
pub struct ConsumeContext {
    pub store: Arc<dyn Store>,
    pub blob: Arc<dyn tender_blob::Blob>,
    pub queue: Arc<dyn Queue>,
    pub extractor: Arc<dyn Extractor>,
    pub llm: Arc<dyn Llm>,
    pub retry: RetryConfig,
}

/// Run the consume loop until `shutdown` is observed. Blocks on
/// `Queue.Reserve(block=5s)` between iterations.
pub async fn run_consume_loop(routine_id: usize, ctx: Arc<ConsumeContext>, shutdown: Arc<AtomicBool>) {
    tracing::debug!(routine_id, "consume routine starting");
    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        match consume_once(&ctx).await {
            Ok(()) => {}
            Err(err) => tracing::error!(routine_id, error = %err, "consume iteration failed"),
        }
    }
    tracing::debug!(routine_id, "consume routine stopped");
}

/// Reserve and process one envelope. Returns without error on a reservation
/// timeout (nothing to do).
pub async fn consume_once(ctx: &ConsumeContext) -> WorkerResult<()> {
    let Some((envelope, token)) = ctx.queue.reserve(Duration::from_secs(5)).await? else {
        return Ok(());
    };

    match &envelope {
        Envelope::ProcessFile { payload, attempt, .. } => {
            process_file(ctx, &token, &envelope, payload.doc_id.clone(), *attempt).await?;
        }
        Envelope::AggregateBatch { payload, .. } => {
            if let Err(err) = aggregate(&payload.batch_id, ctx.store.as_ref()).await {
                tracing::error!(batch_id = %payload.batch_id, error = %err, "aggregation failed; dead-lettering for operator retry");
                ctx.queue.deadletter(&token, envelope, &err.to_string()).await?;
            } else {
                ctx.queue.ack(&token).await?;
            }
        }
    }
    Ok(())
}

async fn process_file(
    ctx: &ConsumeContext,
    token: &tender_queue::Token,
    envelope: &Envelope,
    doc_id: String,
    attempt: u32,
) -> WorkerResult<()> {
    let item = match ctx.store.claim_work_item(&doc_id).await {
        Ok(item) => item,
        Err(tender_store::StoreError::NotClaimable(_)) => {
            // Duplicate delivery: another routine already claimed (or
            // terminated) this attempt.
            ctx.queue.ack(token).await?;
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    // First claim moves the owning batch out of QUEUED.
    let _ = ctx
        .store
        .transition_batch(&item.run_id, &[tender_store::BatchState::Queued], tender_store::BatchState::Processing, None)
        .await?;

    match extract_file(ctx, &item).await {
        Ok(extracted) => {
            ctx.store.mark_work_item_success(&doc_id, extracted).await?;
            ctx.queue.ack(token).await?;
            finalize(&item.run_id, ctx.store.as_ref(), ctx.queue.as_ref()).await?;
        }
        Err(err) => {
            let retry_count = u32::try_from(item.retry_count).unwrap_or(u32::MAX);
            if retry_count < ctx.retry.max_retry_attempts && err.kind.is_retryable() {
                ctx.store.prepare_retry(&doc_id).await?;
                let delay = backoff_ms(&ctx.retry, attempt, err.kind);
                ctx.queue.retry_later(token, envelope.clone(), delay).await?;
            } else {
                ctx.store.mark_work_item_failed(&doc_id, err.kind, &err.message).await?;
                ctx.queue.ack(token).await?;
                finalize(&item.run_id, ctx.store.as_ref(), ctx.queue.as_ref()).await?;
            }
        }
    }
    Ok(())
}

struct ClassifiedError {
    kind: ErrorKind,
    message: String,
}

async fn extract_file(ctx: &ConsumeContext, item: &tender_store::WorkItem) -> Result<Value, ClassifiedError> {
    let bytes = ctx.blob.get(&item.file_key).await.map_err(|e| ClassifiedError {
        kind: ErrorKind::Retryable,
        message: e.to_string(),
    })?;

    let text = ctx
        .extractor
        .extract_text(&bytes, &item.file_type)
        .await
        .map_err(classify_extraction_error)?;

    let chunks = chunk_text(&text, CHUNK_MAX_CHARS);
    if chunks.is_empty() {
        return Ok(serde_json::json!({}));
    }

    let mut merge_items = Vec::with_capacity(chunks.len());
    let base_time = Utc::now();
    for (index, chunk) in chunks.iter().enumerate() {
        let value = ctx
            .llm
            .extract_structured(chunk, &item.filename)
            .await
            .map_err(classify_extraction_error)?;
        merge_items.push(MergeItem { value, order_key: (base_time, format!("{index:06}")) });
    }

    Ok(merge_all(merge_items))
}

fn classify_extraction_error(err: tender_extraction::ExtractionError) -> ClassifiedError {
    use tender_extraction::ExtractionErrorKind as E;
    let kind = match err.kind {
        E::Retryable => ErrorKind::Retryable,
        E::Timeout => ErrorKind::Timeout,
        E::RateLimit => ErrorKind::RateLimit,
        E::LlmError => ErrorKind::LlmError,
        E::ParseError => ErrorKind::ParseError,
        E::Permanent => ErrorKind::Permanent,
        E::Unknown => ErrorKind::Unknown,
    };
    ClassifiedError { kind, message: err.message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tender_blob::MockBlob;
    use tender_extraction::{MockExtractor, MockLlm, Scripted};
    use tender_queue::MockQueue;
    use tender_store::{BatchState, MockStore};

    fn retry_config() -> RetryConfig {
        RetryConfig {
            max_retry_attempts: 3,
            retry_base_delay_ms: 1,
            retry_max_delay_ms: 10,
            rate_limit_floor_ms: 1,
        }
    }

    async fn seed(store: &MockStore, blob: &MockBlob) -> String {
        store.create_batch("b1", "uploads/b1/a.zip", None).await.unwrap();
        store.set_batch_total_files("b1", 1).await.unwrap();
        let (item, _) = store.create_work_item("b1", "d1", "a.pdf", "extracted/b1/a.pdf", "pdf").await.unwrap();
        blob.put("extracted/b1/a.pdf", b"hello world".to_vec()).await.unwrap();
        item.doc_id
    }

    #[tokio::test]
    async fn happy_path_marks_success_and_acks() {
        let store = MockStore::new();
        let blob = MockBlob::new();
        let queue = MockQueue::new();
        seed(&store, &blob).await;

        queue.enqueue(&Envelope::process_file("d1")).await.unwrap();

        let ctx = ConsumeContext {
            store: Arc::new(store),
            blob: Arc::new(blob),
            queue: Arc::new(queue),
            extractor: Arc::new(MockExtractor::new()),
            llm: Arc::new(MockLlm::new()),
            retry: retry_config(),
        };

        consume_once(&ctx).await.unwrap();

        let item = ctx.store.claim_work_item("d1").await;
        assert!(matches!(item, Err(tender_store::StoreError::NotClaimable(_))));
        let batch = ctx.store.get_batch("b1").await.unwrap().unwrap();
        assert_eq!(batch.state, BatchState::Completed);
    }

    #[tokio::test]
    async fn duplicate_delivery_is_acked_without_reprocessing() {
        let store = MockStore::new();
        let blob = MockBlob::new();
        let queue = MockQueue::new();
        seed(&store, &blob).await;
        store.claim_work_item("d1").await.unwrap();
        store.mark_work_item_success("d1", serde_json::json!({})).await.unwrap();

        queue.enqueue(&Envelope::process_file("d1")).await.unwrap();
        let ctx = ConsumeContext {
            store: Arc::new(store),
            blob: Arc::new(blob),
            queue: Arc::new(queue),
            extractor: Arc::new(MockExtractor::new()),
            llm: Arc::new(MockLlm::new()),
            retry: retry_config(),
        };

        consume_once(&ctx).await.unwrap();
        let metrics = ctx.queue.metrics().await.unwrap();
        assert_eq!(metrics.processing, 0);
        assert_eq!(metrics.queue_length, 0);
    }

    #[tokio::test]
    async fn retryable_failure_reschedules_via_retry_later() {
        let store = MockStore::new();
        let blob = MockBlob::new();
        let queue = MockQueue::new();
        seed(&store, &blob).await;

        let extractor = MockExtractor::new();
        extractor.queue("pdf", vec![Scripted::Err(tender_extraction::ExtractionErrorKind::RateLimit, "rate limited".into())]);

        queue.enqueue(&Envelope::process_file("d1")).await.unwrap();
        let ctx = ConsumeContext {
            store: Arc::new(store),
            blob: Arc::new(blob),
            queue: Arc::new(queue),
            extractor: Arc::new(extractor),
            llm: Arc::new(MockLlm::new()),
            retry: retry_config(),
        };

        consume_once(&ctx).await.unwrap();
        let metrics = ctx.queue.metrics().await.unwrap();
        assert_eq!(metrics.delayed, 1);
    }

    #[tokio::test]
    async fn parse_error_fails_without_retry() {
        let store = MockStore::new();
        let blob = MockBlob::new();
        let queue = MockQueue::new();
        seed(&store, &blob).await;

        let extractor = MockExtractor::new();
        extractor.queue("pdf", vec![Scripted::Err(tender_extraction::ExtractionErrorKind::ParseError, "bad pdf".into())]);

        queue.enqueue(&Envelope::process_file("d1")).await.unwrap();
        let ctx = ConsumeContext {
            store: Arc::new(store),
            blob: Arc::new(blob),
            queue: Arc::new(queue),
            extractor: Arc::new(extractor),
            llm: Arc::new(MockLlm::new()),
            retry: retry_config(),
        };

        consume_once(&ctx).await.unwrap();
        let batch = ctx.store.get_batch("b1").await.unwrap().unwrap();
        assert_eq!(batch.state, BatchState::CompletedWithErrors);
    }
}
