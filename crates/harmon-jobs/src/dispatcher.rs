//! The job dispatcher state machine.
//!
//! States: `absent → processing → {success, error}`.
//!
//! - An existing `success` is returned immediately; identical bytes never
//!   re-run the pipeline, regardless of filename.
//! - An existing `processing` on re-submission is treated as a possible
//!   zombie (a prior worker died without a terminal write) and is
//!   unconditionally re-dispatched; no staleness heuristics. Terminal
//!   writes are last-write-wins between the racing runs.
//! - An existing `error` plus a fresh submission dispatches a new run.
//!   That is the caller-driven retry; errors are never retried
//!   automatically.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use harmon_core::{
    BlobStore, ContentDigest, DocumentKind, Error, Job, JobStatus, JobStore, Result,
};

use crate::runner::RunRequest;
use crate::scheduler::Scheduler;

/// Outcome of a submit call.
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    pub digest: ContentDigest,
    /// `Success` for a cache hit, `Processing` when a run was dispatched.
    pub status: JobStatus,
}

/// Receives uploads, deduplicates by digest, and schedules pipeline runs.
pub struct JobDispatcher {
    jobs: Arc<dyn JobStore>,
    blobs: Arc<dyn BlobStore>,
    scheduler: Arc<dyn Scheduler>,
}

/// Blob key: digest plus the original file extension, so stored blobs stay
/// recognizable on disk while identity remains content-only.
fn blob_key(digest: &ContentDigest, filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
            format!("{}.{}", digest, ext.to_lowercase())
        }
        _ => digest.to_string(),
    }
}

impl JobDispatcher {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        blobs: Arc<dyn BlobStore>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            jobs,
            blobs,
            scheduler,
        }
    }

    /// Submit upload bytes for processing.
    #[instrument(skip(self, data))]
    pub async fn submit(
        &self,
        data: &[u8],
        filename: &str,
        kind: DocumentKind,
    ) -> Result<SubmitReceipt> {
        let digest = ContentDigest::of(data);

        match self.jobs.get(&digest).await? {
            Some(job) if job.status == JobStatus::Success => {
                info!(digest = %digest, "Cache hit, returning stored record");
                return Ok(SubmitReceipt {
                    digest,
                    status: JobStatus::Success,
                });
            }
            Some(job) if job.status == JobStatus::Processing => {
                warn!(digest = %digest, "Job still processing on re-submission, re-dispatching possible zombie");
            }
            Some(_) => {
                info!(digest = %digest, "Re-submission of failed job, dispatching fresh run");
            }
            None => {}
        }

        let blob_key = blob_key(&digest, filename);
        self.blobs.save(&blob_key, data).await?;

        let job = Job::processing(digest.clone(), filename);
        self.jobs.save(&digest, &job).await?;

        self.scheduler
            .schedule(RunRequest {
                digest: digest.clone(),
                blob_key,
                filename: filename.to_string(),
                kind,
            })
            .await?;

        Ok(SubmitReceipt {
            digest,
            status: JobStatus::Processing,
        })
    }

    /// Look up job state by digest.
    pub async fn poll(&self, digest: &ContentDigest) -> Result<Job> {
        self.jobs
            .get(digest)
            .await?
            .ok_or_else(|| Error::JobNotFound(digest.to_string()))
    }
}
