//! Durable state for the ingestion pipeline: batches, work items, summaries,
//! and alerts, behind the [`Store`] trait so the worker and API never touch
//! SQL directly.

pub mod error;
pub mod mock;
pub mod models;
pub mod pool;
pub mod postgres;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use mock::MockStore;
pub use models::{
    Alert, AlertSeverity, Batch, BatchState, BatchStats, ErrorKind, Summary, WorkItem, WorkItemState,
};
pub use pool::PoolManager;
pub use postgres::PgStore;
pub use traits::{Store, SummaryCounts};
