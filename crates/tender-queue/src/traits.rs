//! The `Queue` trait: a Redis-backed job queue with delayed-retry and
//! dead-letter semantics. Reservation integrity holds across every
//! implementation: an envelope appears in exactly one of {main, processing,
//! delayed, dead} at any moment observable from outside a single operation.

use async_trait::async_trait;
use std::time::Duration;

use crate::envelope::Envelope;
use crate::error::QueueResult;

/// Point-in-time queue depth counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueMetrics {
    /// Entries in the main work list.
    pub queue_length: u64,
    /// Entries currently claimed.
    pub processing: u64,
    /// Entries scheduled for future retry.
    pub delayed: u64,
    /// Entries that exhausted retries.
    pub dead: u64,
}

/// Reservation token: the raw bytes of the envelope as they were popped
/// from the main list. Acknowledgement is by byte-identity, not by parsing.
pub type Token = Vec<u8>;

/// Redis-backed job queue abstraction.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Atomic right-push to the main list.
    async fn enqueue(&self, envelope: &Envelope) -> QueueResult<()>;

    /// Blocking pop from the main list with a bound of `block_timeout`.
    /// On success, the raw envelope moves into the processing set. Returns
    /// `None` on timeout.
    async fn reserve(&self, block_timeout: Duration) -> QueueResult<Option<(Envelope, Token)>>;

    /// Remove `token`'s entry from the processing set.
    async fn ack(&self, token: &Token) -> QueueResult<()>;

    /// `ack(token)`, then schedule `envelope` (with `attempt` incremented)
    /// into the delayed set, scored `now + delay_ms`.
    async fn retry_later(
        &self,
        token: &Token,
        envelope: Envelope,
        delay_ms: u64,
    ) -> QueueResult<()>;

    /// `ack(token)`, then push `envelope` (with `reason` attached) onto the
    /// dead list.
    async fn deadletter(&self, token: &Token, envelope: Envelope, reason: &str) -> QueueResult<()>;

    /// Atomically drain due entries from the delayed set into the main
    /// list. Returns the number promoted.
    async fn promote_due(&self) -> QueueResult<u64>;

    /// Current depth of all four lists/sets.
    async fn metrics(&self) -> QueueResult<QueueMetrics>;
}
