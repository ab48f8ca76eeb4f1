//! Shared test utilities for integration tests across all ingestion crates.
//!
//! Provides a persistent Tokio runtime and atomic counter shared across ALL
//! integration tests in ALL crates, preventing race conditions and ensuring
//! resource isolation.
//!
//! ## Usage
//!
//! In your test crate's `Cargo.toml`:
//! ```toml
//! [dev-dependencies]
//! tender-test-utils = { path = "../tender-test-utils" }
//! ```
//!
//! In your tests:
//! ```no_run
//! #[test]
//! fn my_integration_test() {
//!     tender_test_utils::get_test_runtime().block_on(async {
//!         let batch_id = tender_test_utils::unique_batch_id("my_test");
//!         // ... test logic ...
//!     })
//! }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

/// Shared Tokio runtime for ALL integration tests across ALL crates.
///
/// Persists for the entire test suite lifetime, preventing "runtime is
/// shutting down" errors when a Store/Queue pool outlives its originating
/// test.
static TEST_RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();

/// Global atomic counter for unique batch/run identifiers across ALL test
/// crates, preventing collisions when tests run in parallel.
static ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Get the shared test runtime (creates on first call, reuses thereafter).
///
/// **Configuration:**
/// - Workers default to CPU count.
/// - Override with `TEST_RUNTIME_WORKERS` environment variable.
///
/// # Panics
/// Panics if the runtime cannot be created.
#[allow(clippy::expect_used)]
pub fn get_test_runtime() -> &'static tokio::runtime::Runtime {
    TEST_RUNTIME.get_or_init(|| {
        let workers = std::env::var("TEST_RUNTIME_WORKERS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(std::num::NonZero::get)
                    .unwrap_or(4)
            });

        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("test-runtime")
            .worker_threads(workers)
            .build()
            .expect("failed to create test runtime")
    })
}

/// Next unique counter value, monotonically increasing across ALL test
/// crates in the process.
pub fn next_id_counter() -> usize {
    ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Build a unique batch/run identifier for a test, combining `prefix` with
/// the process-wide counter so parallel tests never collide on store keys.
pub fn unique_batch_id(prefix: &str) -> String {
    format!("{prefix}-{}", next_id_counter())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_is_reusable() {
        let rt1 = get_test_runtime();
        let rt2 = get_test_runtime();
        assert!(std::ptr::eq(rt1, rt2));
    }

    #[test]
    fn counter_increments() {
        let start = next_id_counter();
        let next = next_id_counter();
        assert_eq!(next, start + 1);
    }

    #[test]
    fn unique_batch_ids_differ() {
        let a = unique_batch_id("batch");
        let b = unique_batch_id("batch");
        assert_ne!(a, b);
        assert!(a.starts_with("batch-"));
    }

    #[test]
    fn runtime_executes_async() {
        let result = get_test_runtime().block_on(async {
            tokio::time::sleep(tokio::time::Duration::from_millis(1)).await;
            42
        });
        assert_eq!(result, 42);
    }
}
