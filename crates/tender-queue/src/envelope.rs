//! Queue envelope schema: opaque to Redis, typed to producers/consumers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload carried by a `process_file` envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessFilePayload {
    /// WorkItem to claim and process.
    pub doc_id: String,
}

/// Payload carried by an `aggregate_batch` envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregateBatchPayload {
    /// Batch to aggregate.
    pub batch_id: String,
}

/// A job envelope. Serialises to
/// `{"type": "...", "id": "...", "attempt": n, "payload": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// One file ready to be claimed and extracted.
    ProcessFile {
        /// Unique attempt id.
        id: Uuid,
        /// 0 on first enqueue, incremented by `RetryLater`.
        attempt: u32,
        /// File to process.
        payload: ProcessFilePayload,
    },
    /// A request to aggregate a quiescent batch.
    AggregateBatch {
        /// Unique attempt id.
        id: Uuid,
        /// 0 on first enqueue, incremented by `RetryLater`.
        attempt: u32,
        /// Batch to aggregate.
        payload: AggregateBatchPayload,
    },
}

impl Envelope {
    /// Construct a first-attempt `process_file` envelope.
    pub fn process_file(doc_id: impl Into<String>) -> Self {
        Self::ProcessFile {
            id: Uuid::new_v4(),
            attempt: 0,
            payload: ProcessFilePayload {
                doc_id: doc_id.into(),
            },
        }
    }

    /// Construct a first-attempt `aggregate_batch` envelope.
    pub fn aggregate_batch(batch_id: impl Into<String>) -> Self {
        Self::AggregateBatch {
            id: Uuid::new_v4(),
            attempt: 0,
            payload: AggregateBatchPayload {
                batch_id: batch_id.into(),
            },
        }
    }

    /// The attempt counter, common to both variants.
    pub const fn attempt(&self) -> u32 {
        match self {
            Self::ProcessFile { attempt, .. } | Self::AggregateBatch { attempt, .. } => *attempt,
        }
    }

    /// Same envelope with `attempt` incremented by one; used by `RetryLater`.
    #[must_use]
    pub fn with_next_attempt(self) -> Self {
        match self {
            Self::ProcessFile {
                id,
                attempt,
                payload,
            } => Self::ProcessFile {
                id,
                attempt: attempt + 1,
                payload,
            },
            Self::AggregateBatch {
                id,
                attempt,
                payload,
            } => Self::AggregateBatch {
                id,
                attempt: attempt + 1,
                payload,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_file_serialises_to_spec_shape() {
        let envelope = Envelope::ProcessFile {
            id: Uuid::nil(),
            attempt: 0,
            payload: ProcessFilePayload {
                doc_id: "d1".to_string(),
            },
        };
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["type"], "process_file");
        assert_eq!(json["attempt"], 0);
        assert_eq!(json["payload"]["doc_id"], "d1");
    }

    #[test]
    fn with_next_attempt_increments_only_attempt() {
        let envelope = Envelope::aggregate_batch("b1");
        let retried = envelope.clone().with_next_attempt();
        assert_eq!(retried.attempt(), envelope.attempt() + 1);
    }
}
