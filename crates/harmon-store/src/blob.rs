//! Blob store backends: in-memory and local disk.
//!
//! Both back the same [`BlobStore`] contract the dispatcher consumes; the
//! embedding application picks one at construction time. Keys are flat
//! strings (the dispatcher uses `{digest}{ext}`), so the disk backend
//! rejects anything that would escape its base directory.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;
use tracing::debug;

use harmon_core::{BlobStore, BlobStream, Error, Result};

/// In-memory blob store for tests and single-process deployments.
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs (test helper).
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn save(&self, key: &str, data: &[u8]) -> Result<String> {
        self.blobs
            .write()
            .await
            .insert(key.to_string(), data.to_vec());
        Ok(format!("mem://{}", key))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("blob '{}'", key)))
    }

    async fn get_stream(&self, key: &str) -> Result<BlobStream> {
        let data = self.get(key).await?;
        Ok(Box::new(Cursor::new(data)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.blobs.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .blobs
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}

/// Local-disk blob store. Content lives as flat files under a base
/// directory; the locator is the absolute file path.
pub struct LocalDiskBlobStore {
    base_dir: PathBuf,
}

impl LocalDiskBlobStore {
    /// Create a store rooted at `base_dir`, creating the directory if
    /// needed.
    pub async fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        tokio::fs::create_dir_all(&base_dir).await?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains('/') || key.contains("..") {
            return Err(Error::InvalidInput(format!(
                "invalid blob key '{}': keys must be flat file names",
                key
            )));
        }
        Ok(self.base_dir.join(key))
    }
}

#[async_trait]
impl BlobStore for LocalDiskBlobStore {
    async fn save(&self, key: &str, data: &[u8]) -> Result<String> {
        let path = self.path_for(key)?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| Error::Storage(format!("write '{}': {}", path.display(), e)))?;
        debug!(key, bytes = data.len(), "Saved blob to disk");
        Ok(path.to_string_lossy().into_owned())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("blob '{}'", key)))
            }
            Err(e) => Err(Error::Storage(format!("read '{}': {}", path.display(), e))),
        }
    }

    async fn get_stream(&self, key: &str) -> Result<BlobStream> {
        let path = self.path_for(key)?;
        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("blob '{}'", key)))
            }
            Err(e) => Err(Error::Storage(format!("open '{}': {}", path.display(), e))),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!(
                "delete '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.base_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(Error::Storage(format!("list: {}", e))),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::Storage(format!("list: {}", e)))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(prefix) {
                keys.push(name);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Read a [`BlobStream`] to the end (convenience for stream consumers).
pub async fn read_stream_to_end(mut stream: BlobStream) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    Ok(buf)
}
