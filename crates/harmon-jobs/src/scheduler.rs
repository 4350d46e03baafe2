//! Scheduling boundary implementations.
//!
//! One contract, two in-process paths: [`InlineScheduler`] executes the run
//! in the calling context before `schedule` returns; [`WorkerScheduler`]
//! enqueues the request for a background drain loop with a concurrency
//! cap. Because a [`RunRequest`] is a plain serializable value, an external
//! queue (publish the request, let a remote worker's handler execute it)
//! slots behind the same trait. Observable JobStore transitions are
//! identical on every path.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{error, info};

use harmon_core::defaults::{WORKER_MAX_CONCURRENT, WORKER_QUEUE_DEPTH};
use harmon_core::{Error, Result};

use crate::runner::{RunHandler, RunRequest};

/// Uniform "fire and eventually write terminal job state" contract behind
/// inline and deferred execution.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn schedule(&self, request: RunRequest) -> Result<()>;
}

/// Runs the pipeline synchronously in the caller. The submit call does not
/// return until the terminal job state is written.
pub struct InlineScheduler {
    handler: Arc<dyn RunHandler>,
}

impl InlineScheduler {
    pub fn new(handler: Arc<dyn RunHandler>) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl Scheduler for InlineScheduler {
    async fn schedule(&self, request: RunRequest) -> Result<()> {
        self.handler.execute(request).await;
        Ok(())
    }
}

/// Configuration for the background worker scheduler.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum number of concurrently executing pipeline runs.
    pub max_concurrent: usize,
    /// Depth of the dispatch queue; submits beyond it apply backpressure.
    pub queue_depth: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: WORKER_MAX_CONCURRENT,
            queue_depth: WORKER_QUEUE_DEPTH,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `HARMON_MAX_CONCURRENT` | `4` | Max concurrent pipeline runs |
    /// | `HARMON_QUEUE_DEPTH` | `64` | Dispatch queue depth |
    pub fn from_env() -> Self {
        let max_concurrent = std::env::var("HARMON_MAX_CONCURRENT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(WORKER_MAX_CONCURRENT)
            .max(1);
        let queue_depth = std::env::var("HARMON_QUEUE_DEPTH")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(WORKER_QUEUE_DEPTH)
            .max(1);
        Self {
            max_concurrent,
            queue_depth,
        }
    }

    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self
    }
}

/// Handle for stopping a running worker scheduler.
///
/// Shutdown drains in-flight runs but abandons queued requests that were
/// never claimed; their jobs stay `processing` and are picked up by the
/// zombie re-dispatch on the next submission.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal the drain loop to stop and wait for in-flight runs.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(()).await;
        self.join
            .await
            .map_err(|e| Error::Internal(format!("worker scheduler task failed: {}", e)))
    }
}

/// Queue-backed scheduler: requests execute on a background drain loop.
pub struct WorkerScheduler {
    run_tx: mpsc::Sender<RunRequest>,
}

impl WorkerScheduler {
    /// Start the drain loop and return the scheduler plus its handle.
    pub fn start(handler: Arc<dyn RunHandler>, config: WorkerConfig) -> (Self, WorkerHandle) {
        let (run_tx, mut run_rx) = mpsc::channel::<RunRequest>(config.queue_depth);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let max_concurrent = config.max_concurrent.max(1);
        let join = tokio::spawn(async move {
            info!(max_concurrent, "Worker scheduler started");
            let semaphore = Arc::new(Semaphore::new(max_concurrent));
            let mut tasks: JoinSet<()> = JoinSet::new();

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Worker scheduler received shutdown signal");
                        break;
                    }
                    request = run_rx.recv() => {
                        let Some(request) = request else { break };
                        let permit = match semaphore.clone().acquire_owned().await {
                            Ok(permit) => permit,
                            Err(_) => break,
                        };
                        let handler = handler.clone();
                        tasks.spawn(async move {
                            handler.execute(request).await;
                            drop(permit);
                        });
                        // Reap whatever already finished
                        while let Some(joined) = tasks.try_join_next() {
                            if let Err(e) = joined {
                                error!(error = ?e, "Pipeline run task panicked");
                            }
                        }
                    }
                }
            }

            // Drain in-flight runs before stopping
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    error!(error = ?e, "Pipeline run task panicked");
                }
            }
            info!("Worker scheduler stopped");
        });

        (Self { run_tx }, WorkerHandle { shutdown_tx, join })
    }
}

#[async_trait]
impl Scheduler for WorkerScheduler {
    async fn schedule(&self, request: RunRequest) -> Result<()> {
        self.run_tx
            .send(request)
            .await
            .map_err(|_| Error::Job("worker scheduler is stopped".to_string()))
    }
}
