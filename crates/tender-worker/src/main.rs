//! Tender Worker process.
//!
//! Consumes the job queue with bounded concurrency, drives per-file
//! extraction through retry/back-off, and runs the reap tick that
//! guarantees every batch reaches a terminal state even if no further job
//! ever arrives.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tender_config::{ApplicationConfig, Profile};
use tender_queue::RedisQueue;
use tender_store::{PgStore, PoolManager};
use tender_worker::{ConsumeContext, Worker};
use tracing::info;

type MainResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> MainResult {
    tender_common::initialize_environment();
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    info!("starting tender worker");
    let config = ApplicationConfig::with_profile(Profile::Production);

    let pools = PoolManager::connect(&config.store).await?;
    let store: Arc<dyn tender_store::Store> = Arc::new(PgStore::new(pools));
    let blob: Arc<dyn tender_blob::Blob> = Arc::new(tender_blob::FsBlob::new(&config.blob));
    let queue: Arc<dyn tender_queue::Queue> = Arc::new(RedisQueue::connect(&config.queue).await?);

    let ctx = ConsumeContext {
        store,
        blob,
        queue,
        extractor: Arc::new(tender_extraction::PlaintextExtractor::new()),
        llm: Arc::new(tender_extraction::EchoLlm::new()),
        retry: config.retry.clone(),
    };

    let worker = Worker::new(ctx, config.worker.clone());
    let shutdown = worker.shutdown_handle();

    let run_handle = tokio::spawn(async move { worker.run().await });

    shutdown_signal().await;
    info!("shutdown requested");
    shutdown.store(true, Ordering::Relaxed);

    run_handle.await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
