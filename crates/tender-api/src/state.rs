//! Application state for Axum handlers: shared Store/Blob/Queue handles
//! and the Expander config, initialized once at startup.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tender_config::ExpanderConfig;

/// Minimum interval between accepted `process` triggers for the same
/// batch; a tighter call is rejected with 429 rather than re-queuing
/// duplicate expansion work.
const PROCESS_RATE_LIMIT_WINDOW: std::time::Duration = std::time::Duration::from_secs(2);

/// Shared resources passed to every handler via dependency injection.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn tender_store::Store>,
    pub blob: Arc<dyn tender_blob::Blob>,
    pub queue: Arc<dyn tender_queue::Queue>,
    pub expander_config: Arc<ExpanderConfig>,
    pub max_file_size_bytes: u64,
    process_rate_limiter: Arc<DashMap<String, Instant>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn tender_store::Store>,
        blob: Arc<dyn tender_blob::Blob>,
        queue: Arc<dyn tender_queue::Queue>,
        expander_config: ExpanderConfig,
        max_file_size_bytes: u64,
    ) -> Self {
        Self {
            store,
            blob,
            queue,
            expander_config: Arc::new(expander_config),
            max_file_size_bytes,
            process_rate_limiter: Arc::new(DashMap::new()),
        }
    }

    /// Returns `true` if a `process` trigger for `batch_id` is allowed
    /// right now, recording the attempt either way.
    pub fn allow_process_trigger(&self, batch_id: &str) -> bool {
        let now = Instant::now();
        let mut allowed = true;
        self.process_rate_limiter
            .entry(batch_id.to_string())
            .and_modify(|last| {
                if now.duration_since(*last) < PROCESS_RATE_LIMIT_WINDOW {
                    allowed = false;
                } else {
                    *last = now;
                }
            })
            .or_insert(now);
        allowed
    }
}
