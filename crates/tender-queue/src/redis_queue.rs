//! Redis-backed [`Queue`] implementation.
//!
//! The main list and processing list form a reliable-queue pair moved
//! between with `BLMOVE`, so an envelope is never observable outside both
//! lists at once. `RetryLater`/`Deadletter`/`PromoteDue` each run as a
//! single Lua script so the processing-list removal and the delayed/dead
//! insertion commit atomically.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tender_config::QueueConfig;

use crate::envelope::Envelope;
use crate::error::QueueResult;
use crate::traits::{Queue, QueueMetrics, Token};

/// Derived Redis key names for one queue base name.
#[derive(Debug, Clone)]
struct Keys {
    main: String,
    processing: String,
    delayed: String,
    dead: String,
}

impl Keys {
    fn derive(base: &str) -> Self {
        Self {
            main: base.to_string(),
            processing: format!("{base}:processing"),
            delayed: format!("{base}:delayed"),
            dead: format!("{base}:dead"),
        }
    }
}

/// `Queue` over a single Redis connection managed by
/// [`redis::aio::ConnectionManager`] (auto-reconnecting, cheap to clone).
#[derive(Clone)]
pub struct RedisQueue {
    conn: ConnectionManager,
    keys: Keys,
}

impl RedisQueue {
    /// Connect to `config.redis_url` and derive the four queue keys from
    /// `config.queue_key`.
    pub async fn connect(config: &QueueConfig) -> QueueResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            keys: Keys::derive(&config.queue_key),
        })
    }

    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

#[async_trait]
impl Queue for RedisQueue {
    async fn enqueue(&self, envelope: &Envelope) -> QueueResult<()> {
        let bytes = serde_json::to_vec(envelope)?;
        let mut conn = self.conn();
        let _: i64 = conn.rpush(&self.keys.main, bytes).await?;
        tracing::debug!(envelope_id = ?envelope_id(envelope), envelope_type = envelope_type(envelope), "queue enqueue");
        Ok(())
    }

    async fn reserve(&self, block_timeout: Duration) -> QueueResult<Option<(Envelope, Token)>> {
        let mut conn = self.conn();
        let raw: Option<Vec<u8>> = redis::cmd("BLMOVE")
            .arg(&self.keys.main)
            .arg(&self.keys.processing)
            .arg("LEFT")
            .arg("RIGHT")
            .arg(block_timeout.as_secs_f64())
            .query_async(&mut conn)
            .await?;

        let Some(bytes) = raw else {
            return Ok(None);
        };

        let envelope: Envelope = serde_json::from_slice(&bytes)?;
        tracing::debug!(envelope_id = ?envelope_id(&envelope), envelope_type = envelope_type(&envelope), "queue reserve");
        Ok(Some((envelope, bytes)))
    }

    async fn ack(&self, token: &Token) -> QueueResult<()> {
        let mut conn = self.conn();
        let _: i64 = conn.lrem(&self.keys.processing, 0, token).await?;
        tracing::debug!("queue ack");
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
        let score = Utc::now().timestamp_millis() + i64::try_from(delay_ms).unwrap_or(i64::MAX);

        let script = redis::Script::new(
            r"
            redis.call('LREM', KEYS[1], 0, ARGV[1])
            redis.call('ZADD', KEYS[2], ARGV[2], ARGV[3])
            return 1
            ",
        );
        let mut conn = self.conn();
        let _: i64 = script
            .key(&self.keys.processing)
            .key(&self.keys.delayed)
            .arg(token.as_slice())
            .arg(score)
            .arg(member)
            .invoke_async(&mut conn)
            .await?;

        tracing::debug!(envelope_id = ?envelope_id(&retried), delay_ms, "queue retry_later");
        Ok(())
    }

    async fn deadletter(&self, token: &Token, envelope: Envelope, reason: &str) -> QueueResult<()> {
        let dead_entry = serde_json::json!({ "envelope": envelope, "reason": reason });
        let member = serde_json::to_vec(&dead_entry)?;

        let script = redis::Script::new(
            r"
            redis.call('LREM', KEYS[1], 0, ARGV[1])
            redis.call('RPUSH', KEYS[2], ARGV[2])
            return 1
            ",
        );
        let mut conn = self.conn();
        let _: i64 = script
            .key(&self.keys.processing)
            .key(&self.keys.dead)
            .arg(token.as_slice())
            .arg(member)
            .invoke_async(&mut conn)
            .await?;

        tracing::warn!(envelope_id = ?envelope_id(&envelope), reason, "queue deadletter");
        Ok(())
    }

    async fn promote_due(&self) -> QueueResult<u64> {
        let now = Utc::now().timestamp_millis();

        let script = redis::Script::new(
            r"
            local due = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1])
            for _, member in ipairs(due) do
                redis.call('ZREM', KEYS[1], member)
                redis.call('RPUSH', KEYS[2], member)
            end
            return #due
            ",
        );
        let mut conn = self.conn();
        let promoted: i64 = script
            .key(&self.keys.delayed)
            .key(&self.keys.main)
            .arg(now)
            .invoke_async(&mut conn)
            .await?;

        Ok(u64::try_from(promoted).unwrap_or(0))
    }

    async fn metrics(&self) -> QueueResult<QueueMetrics> {
        let mut conn = self.conn();
        let queue_length: u64 = conn.llen(&self.keys.main).await?;
        let processing: u64 = conn.llen(&self.keys.processing).await?;
        let delayed: u64 = conn.zcard(&self.keys.delayed).await?;
        let dead: u64 = conn.llen(&self.keys.dead).await?;
        Ok(QueueMetrics {
            queue_length,
            processing,
            delayed,
            dead,
        })
    }
}

fn envelope_id(envelope: &Envelope) -> uuid::Uuid {
    match envelope {
        Envelope::ProcessFile { id, .. } | Envelope::AggregateBatch { id, .. } => *id,
    }
}

fn envelope_type(envelope: &Envelope) -> &'static str {
    match envelope {
        Envelope::ProcessFile { .. } => "process_file",
        Envelope::AggregateBatch { .. } => "aggregate_batch",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_derive_from_base_name() {
        let keys = Keys::derive("Q");
        assert_eq!(keys.main, "Q");
        assert_eq!(keys.processing, "Q:processing");
        assert_eq!(keys.delayed, "Q:delayed");
        assert_eq!(keys.dead, "Q:dead");
    }
}
