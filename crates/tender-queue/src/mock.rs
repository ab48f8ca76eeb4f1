//! In-memory [`Queue`] double for unit tests. Mirrors the four Redis key
//! roles without a live Redis instance; `reserve` never actually blocks.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::envelope::Envelope;
use crate::error::QueueResult;
use crate::traits::{Queue, QueueMetrics, Token};

#[derive(Default)]
struct Inner {
    main: VecDeque<Vec<u8>>,
    processing: Vec<Vec<u8>>,
    delayed: Vec<(i64, Vec<u8>)>,
    dead: Vec<Vec<u8>>,
}

/// `Mutex`-guarded in-memory [`Queue`]. Single-process only.
#[derive(Default)]
pub struct MockQueue {
    inner: Mutex<Inner>,
}

impl MockQueue {
    /// Construct an empty queue.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Queue for MockQueue {
    async fn enqueue(&self, envelope: &Envelope) -> QueueResult<()> {
        let bytes = serde_json::to_vec(envelope)?;
        self.inner.lock().await.main.push_back(bytes);
        Ok(())
    }

    async fn reserve(&self, _block_timeout: Duration) -> QueueResult<Option<(Envelope, Token)>> {
        let mut inner = self.inner.lock().await;
        let Some(bytes) = inner.main.pop_front() else {
            return Ok(None);
        };
        inner.processing.push(bytes.clone());
        let envelope: Envelope = serde_json::from_slice(&bytes)?;
        Ok(Some((envelope, bytes)))
    }

    async fn ack(&self, token: &Token) -> QueueResult<()> {
        let mut inner = self.inner.lock().await;
        inner.processing.retain(|entry| entry != token);
        Ok(())
    }

    async fn retry_later(
        &self,
        token: &Token,
        envelope: Envelope,
        delay_ms: u64,
    ) -> QueueResult<()> {
        let retried = envelope.with_next_attempt();
        let member = serde_json::to_vec(&retried)?;
        let score = chrono::Utc::now().timestamp_millis() + i64::try_from(delay_ms).unwrap_or(i64::MAX);

        let mut inner = self.inner.lock().await;
        inner.processing.retain(|entry| entry != token);
        inner.delayed.push((score, member));
        Ok(())
    }

    async fn deadletter(&self, token: &Token, envelope: Envelope, reason: &str) -> QueueResult<()> {
        let dead_entry = serde_json::json!({ "envelope": envelope, "reason": reason });
        let member = serde_json::to_vec(&dead_entry)?;

        let mut inner = self.inner.lock().await;
        inner.processing.retain(|entry| entry != token);
        inner.dead.push(member);
        Ok(())
    }

    async fn promote_due(&self) -> QueueResult<u64> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut inner = self.inner.lock().await;
        let (due, not_due): (Vec<_>, Vec<_>) =
            inner.delayed.drain(..).partition(|(score, _)| *score <= now);
        inner.delayed = not_due;
        let count = due.len();
        for (_, member) in due {
            inner.main.push_back(member);
        }
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn metrics(&self) -> QueueResult<QueueMetrics> {
        let inner = self.inner.lock().await;
        Ok(QueueMetrics {
            queue_length: u64::try_from(inner.main.len()).unwrap_or(0),
            processing: u64::try_from(inner.processing.len()).unwrap_or(0),
            delayed: u64::try_from(inner.delayed.len()).unwrap_or(0),
            dead: u64::try_from(inner.dead.len()).unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_then_reserve_round_trips() {
        let queue = MockQueue::new();
        queue.enqueue(&Envelope::process_file("d1")).await.unwrap();
        let (envelope, token) = queue
            .reserve(Duration::from_millis(10))
            .await
            .unwrap()
            .expect("entry available");
        assert!(matches!(envelope, Envelope::ProcessFile { .. }));
        queue.ack(&token).await.unwrap();

        let metrics = queue.metrics().await.unwrap();
        assert_eq!(metrics.queue_length, 0);
        assert_eq!(metrics.processing, 0);
    }

    #[tokio::test]
    async fn reserve_on_empty_queue_returns_none() {
        let queue = MockQueue::new();
        assert!(queue.reserve(Duration::from_millis(10)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn retry_later_moves_entry_to_delayed_with_incremented_attempt() {
        let queue = MockQueue::new();
        queue.enqueue(&Envelope::process_file("d1")).await.unwrap();
        let (envelope, token) = queue.reserve(Duration::from_millis(10)).await.unwrap().unwrap();
        queue.retry_later(&token, envelope, 0).await.unwrap();

        let metrics = queue.metrics().await.unwrap();
        assert_eq!(metrics.processing, 0);
        assert_eq!(metrics.delayed, 1);

        let promoted = queue.promote_due().await.unwrap();
        assert_eq!(promoted, 1);
        let metrics = queue.metrics().await.unwrap();
        assert_eq!(metrics.queue_length, 1);

        let (retried, _) = queue.reserve(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(retried.attempt(), 1);
    }

    #[tokio::test]
    async fn deadletter_records_reason_and_clears_processing() {
        let queue = MockQueue::new();
        queue.enqueue(&Envelope::process_file("d1")).await.unwrap();
        let (envelope, token) = queue.reserve(Duration::from_millis(10)).await.unwrap().unwrap();
        queue.deadletter(&token, envelope, "parse error").await.unwrap();

        let metrics = queue.metrics().await.unwrap();
        assert_eq!(metrics.processing, 0);
        assert_eq!(metrics.dead, 1);
    }
}
