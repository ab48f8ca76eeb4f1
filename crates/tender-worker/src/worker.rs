//! The Worker process: `N` consume routines plus one reap routine, under a
//! shared shutdown signal. No shared mutable state inside a process — all
//! coordination happens through Store and Queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tender_config::WorkerConfig;
use tender_queue::Queue;
use tender_store::Store;
use tokio::task::JoinSet;
use tokio::time::sleep;

use crate::consume::{run_consume_loop, ConsumeContext};
use crate::reap::reap_tick;

/// Long-running Worker: spawns `worker_concurrency` consume routines and
/// one reap routine, draining them on shutdown.
pub struct Worker {
    ctx: Arc<ConsumeContext>,
    worker_config: WorkerConfig,
    shutdown_signal: Arc<AtomicBool>,
}

impl Worker {
    pub fn new(ctx: ConsumeContext, worker_config: WorkerConfig) -> Self {
        Self { ctx: Arc::new(ctx), worker_config, shutdown_signal: Arc::new(AtomicBool::new(false)) }
    }

    /// Handle for triggering graceful shutdown from outside `run`.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown_signal)
    }

    /// Run until the shutdown signal is set, then drain in-flight routines.
    pub async fn run(&self) {
        tracing::info!(concurrency = self.worker_config.worker_concurrency, "worker starting");

        let mut join_set = JoinSet::new();

        for routine_id in 0..self.worker_config.worker_concurrency {
            let ctx = Arc::clone(&self.ctx);
            let shutdown = Arc::clone(&self.shutdown_signal);
            join_set.spawn(async move {
                run_consume_loop(routine_id, ctx, shutdown).await;
            });
        }

        {
            let store: Arc<dyn Store> = Arc::clone(&self.ctx.store);
            let queue: Arc<dyn Queue> = Arc::clone(&self.ctx.queue);
            let shutdown = Arc::clone(&self.shutdown_signal);
            let reap_interval = self.worker_config.reap_interval();
            let quiescent_idle_ms = self.worker_config.quiescent_idle_ms;
            join_set.spawn(async move {
                loop {
                    if shutdown.load(Ordering::Relaxed) {
                        break;
                    }
                    if let Err(err) = reap_tick(store.as_ref(), queue.as_ref(), quiescent_idle_ms).await {
                        tracing::error!(error = %err, "reap tick failed");
                    }
                    sleep(reap_interval).await;
                }
            });
        }

        while !self.shutdown_signal.load(Ordering::Relaxed) {
            sleep(std::time::Duration::from_millis(200)).await;
        }

        tracing::info!("shutdown signal received, draining routines");
        while let Some(result) = join_set.join_next().await {
            if let Err(err) = result {
                tracing::error!(error = %err, "worker routine panicked");
            }
        }
        tracing::info!("worker stopped gracefully");
    }
}
