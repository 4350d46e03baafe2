//! Trait definitions for harmon's collaborator seams.
//!
//! Every unreliable or deployment-specific capability sits behind one of
//! these traits: storage backends, the generation endpoint, and the leaf
//! extractors. Implementations are constructed explicitly and passed in;
//! nothing here is resolved from ambient globals.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::digest::ContentDigest;
use crate::error::Result;
use crate::models::{DocType, Job, PageRecord, TableRecord};

// =============================================================================
// STORAGE TRAITS
// =============================================================================

/// Readable byte stream handed out by [`BlobStore::get_stream`].
pub type BlobStream = Box<dyn AsyncRead + Send + Unpin>;

/// Durable map from a storage key to raw bytes.
///
/// Keys are caller-chosen (the dispatcher uses `{digest}.{ext}`). `get` and
/// `get_stream` fail with [`crate::Error::NotFound`] for absent keys.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under a key, returning a backend-specific locator.
    async fn save(&self, key: &str, data: &[u8]) -> Result<String>;

    /// Retrieve the full byte content for a key.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Open a readable stream over the content for a key.
    async fn get_stream(&self, key: &str) -> Result<BlobStream>;

    /// Delete the content for a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List stored keys starting with a prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Durable map from content digest to job record.
///
/// `save` is a full-record overwrite; concurrent terminal writes for the
/// same digest are last-write-wins by design.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn save(&self, digest: &ContentDigest, job: &Job) -> Result<()>;

    async fn get(&self, digest: &ContentDigest) -> Result<Option<Job>>;
}

// =============================================================================
// GENERATION TRAITS
// =============================================================================

/// Failure classes for one generation call. The synthesizer's retry policy
/// branches on these instead of string-matching provider messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Quota/rate-limit class (HTTP 429). Retry with backoff.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Server overload class (HTTP 503). Retry with backoff.
    #[error("overloaded: {0}")]
    Overloaded(String),

    /// Request rejected as malformed/incompatible (HTTP 400). Abandon the
    /// candidate immediately.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Provider returned an empty or safety-blocked response body.
    #[error("blocked or empty response: {0}")]
    Blocked(String),

    /// Anything else (transport errors, 5xx, unparseable provider errors).
    #[error("generation failed: {0}")]
    Unknown(String),
}

impl GenerationError {
    /// Whether this failure class warrants exponential backoff.
    pub fn is_backoff(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Overloaded(_))
    }
}

/// Capability wrapping an external text/JSON generation endpoint.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Ordered candidate model identifiers, most-preferred first.
    async fn list_candidates(&self) -> Result<Vec<String>>;

    /// Generate text with a specific candidate model.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> std::result::Result<String, GenerationError>;
}

// =============================================================================
// EXTRACTOR TRAITS
// =============================================================================

/// Classifies a materialized PDF as digital or scanned.
#[async_trait]
pub trait TypeDetector: Send + Sync {
    async fn detect(&self, path: &Path) -> Result<DocType>;
}

/// Text-layer extraction strategy. `Layout` is the secondary fallback used
/// when the raw pass yields no non-blank page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStrategy {
    Raw,
    Layout,
}

/// Extracts the text layer of a digital PDF, one record per page.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_pages(&self, path: &Path, strategy: TextStrategy) -> Result<Vec<PageRecord>>;
}

/// OCRs a scanned (or misdetected) PDF, one record per page.
#[async_trait]
pub trait OcrExtractor: Send + Sync {
    async fn ocr_pages(&self, path: &Path) -> Result<Vec<PageRecord>>;
}

/// Detects table grids in a PDF. Grid detection itself is an external
/// capability; implementations adapt its output to [`TableRecord`]s.
#[async_trait]
pub trait TableExtractor: Send + Sync {
    async fn extract_tables(&self, path: &Path) -> Result<Vec<TableRecord>>;
}
