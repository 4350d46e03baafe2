//! Pipeline run execution behind the scheduling boundary.
//!
//! A [`RunRequest`] is a plain serializable descriptor (digest, blob key,
//! filename, kind), so a deferred scheduler can carry it across a process
//! boundary: an external queue ships the JSON, a same-process worker ships
//! the struct. [`PipelineRunner`] turns a request into one pipeline run
//! and always writes terminal job state: its outer boundary catches every
//! error *and panic*, so nothing above it can leave a job stuck in
//! `processing`.

use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use harmon_core::{BlobStore, ContentDigest, DocumentKind, Job, JobStore};
use harmon_pipeline::Pipeline;

/// One schedulable pipeline run, fully described by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub digest: ContentDigest,
    /// Key of the stored upload in the blob store.
    pub blob_key: String,
    pub filename: String,
    pub kind: DocumentKind,
}

/// Executes run requests. The seam between schedulers and the pipeline;
/// test schedulers substitute a stub.
#[async_trait]
pub trait RunHandler: Send + Sync {
    async fn execute(&self, request: RunRequest);
}

/// The production handler: materialize the blob, run the pipeline stages,
/// write terminal state.
pub struct PipelineRunner {
    jobs: Arc<dyn JobStore>,
    blobs: Arc<dyn BlobStore>,
    pipeline: Arc<Pipeline>,
}

impl PipelineRunner {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        blobs: Arc<dyn BlobStore>,
        pipeline: Arc<Pipeline>,
    ) -> Self {
        Self {
            jobs,
            blobs,
            pipeline,
        }
    }

    /// One pipeline run. Storage failures are fatal to the run and become
    /// the job's terminal error.
    async fn run_inner(&self, request: &RunRequest) {
        let data = match self.blobs.get(&request.blob_key).await {
            Ok(data) => data,
            Err(e) => {
                let message = format!("Failed to read stored upload: {}", e);
                error!(digest = %request.digest, error = %message, "Run aborted");
                self.write_terminal_error(request, &message).await;
                return;
            }
        };

        let report = self
            .pipeline
            .run(&data, &request.filename, request.kind)
            .await;

        let base = self.base_job(request).await;

        // An error-shaped record is a terminal error: pollers get the
        // message and the well-formed record, and an explicit re-submission
        // retries.
        let terminal = if let Some(message) = report.metadata.error.clone() {
            let mut job = base.fail(message);
            job.result = Some(report.metadata.clone());
            job
        } else {
            base.complete(report.metadata.clone())
        };

        if let Err(e) = self.jobs.save(&request.digest, &terminal).await {
            // The terminal write itself failed; there is no store left to
            // record the failure in.
            error!(digest = %request.digest, error = %e, "Failed to write terminal job state");
        } else {
            info!(
                digest = %request.digest,
                status = ?terminal.status,
                stage_errors = report.errors.len(),
                "Terminal job state written"
            );
        }
    }

    /// Current job record, or a fresh `processing` one if the store lost it.
    async fn base_job(&self, request: &RunRequest) -> Job {
        match self.jobs.get(&request.digest).await {
            Ok(Some(job)) => job,
            _ => Job::processing(request.digest.clone(), &request.filename),
        }
    }

    /// Catch-all terminal write used by the panic and storage boundaries.
    async fn write_terminal_error(&self, request: &RunRequest, message: &str) {
        let base = self.base_job(request).await;
        if let Err(e) = self.jobs.save(&request.digest, &base.fail(message)).await {
            error!(digest = %request.digest, error = %e, "Failed to write terminal error state");
        }
    }
}

#[async_trait]
impl RunHandler for PipelineRunner {
    async fn execute(&self, request: RunRequest) {
        let inner = self.run_inner(&request);
        if let Err(panic) = std::panic::AssertUnwindSafe(inner).catch_unwind().await {
            let message = panic_message(&panic);
            error!(digest = %request.digest, error = %message, "Pipeline run panicked");
            self.write_terminal_error(&request, &message).await;
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("pipeline run panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("pipeline run panicked: {}", s)
    } else {
        "pipeline run panicked".to_string()
    }
}
