//! Worker process: consumes the job queue, drives per-file extraction with
//! retry/back-off, and runs the dual-driver finalization protocol
//! (event-driven, state-driven reap, and on-demand) that guarantees every
//! batch reaches a terminal state with exactly one Summary.

pub mod aggregator;
pub mod backoff;
pub mod consume;
pub mod error;
pub mod finalizer;
pub mod merge;
pub mod reap;
pub mod worker;

pub use aggregator::aggregate;
pub use backoff::backoff_ms;
pub use consume::{consume_once, run_consume_loop, ConsumeContext};
pub use error::{WorkerError, WorkerResult};
pub use finalizer::{finalize, FinalizeOutcome};
pub use reap::reap_tick;
pub use worker::Worker;
