//! Job store backends: in-memory and flat-file JSON.
//!
//! A job record is a small JSON document keyed by content digest. The
//! flat-file backend keeps one `{digest}.json` per job under a directory,
//! which doubles as the result cache for idempotent re-submissions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use harmon_core::{ContentDigest, Error, Job, JobStore, Result};

/// In-memory job store for tests and single-process deployments.
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<RwLock<HashMap<ContentDigest, Job>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored jobs (test helper).
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn save(&self, digest: &ContentDigest, job: &Job) -> Result<()> {
        self.jobs.write().await.insert(digest.clone(), job.clone());
        Ok(())
    }

    async fn get(&self, digest: &ContentDigest) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(digest).cloned())
    }
}

/// Flat-file job store: one pretty-printed `{digest}.json` per record.
pub struct JsonFileJobStore {
    dir: PathBuf,
}

impl JsonFileJobStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, digest: &ContentDigest) -> PathBuf {
        self.dir.join(format!("{}.json", digest))
    }
}

#[async_trait]
impl JobStore for JsonFileJobStore {
    async fn save(&self, digest: &ContentDigest, job: &Job) -> Result<()> {
        let path = self.path_for(digest);
        let json = serde_json::to_vec_pretty(job)?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| Error::Storage(format!("write '{}': {}", path.display(), e)))?;
        debug!(digest = %digest, status = ?job.status, "Persisted job record");
        Ok(())
    }

    async fn get(&self, digest: &ContentDigest) -> Result<Option<Job>> {
        let path = self.path_for(digest);
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Storage(format!("read '{}': {}", path.display(), e)))
            }
        };
        match serde_json::from_slice::<Job>(&data) {
            Ok(job) => Ok(Some(job)),
            Err(e) => {
                // A corrupt record is treated as absent so re-submission can
                // repair it, matching the cache-miss behavior on bad JSON.
                warn!(digest = %digest, error = %e, "Unreadable job record, treating as absent");
                Ok(None)
            }
        }
    }
}
