//! Redis-backed job queue with delayed-retry and dead-letter semantics.

pub mod envelope;
pub mod error;
pub mod mock;
pub mod redis_queue;
pub mod traits;

pub use envelope::{AggregateBatchPayload, Envelope, ProcessFilePayload};
pub use error::{QueueError, QueueResult};
pub use mock::MockQueue;
pub use redis_queue::RedisQueue;
pub use traits::{Queue, QueueMetrics, Token};
