//! Application bootstrap and dependency injection, separated from `main`
//! so tests can construct an [`AppState`] without going through the binary
//! entry point.

use std::sync::Arc;

use tender_config::ApplicationConfig;
use tender_queue::RedisQueue;
use tender_store::{PgStore, PoolManager};
use tracing::info;

use crate::state::AppState;

pub type BootstrapResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Connect to Postgres, Redis, and the configured blob root, then build the
/// shared [`AppState`].
pub async fn initialize_app_state(config: &ApplicationConfig) -> BootstrapResult<AppState> {
    info!("connecting to store");
    let pools = PoolManager::connect(&config.store).await?;
    let store: Arc<dyn tender_store::Store> = Arc::new(PgStore::new(pools));

    info!("opening blob root at {}", config.blob.root_dir);
    let blob: Arc<dyn tender_blob::Blob> = Arc::new(tender_blob::FsBlob::new(&config.blob));

    info!("connecting to queue");
    let queue: Arc<dyn tender_queue::Queue> = Arc::new(RedisQueue::connect(&config.queue).await?);

    Ok(AppState::new(
        store,
        blob,
        queue,
        config.expander.clone(),
        config.api.max_file_size_bytes,
    ))
}
