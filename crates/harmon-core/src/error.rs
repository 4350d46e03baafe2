//! Error types for harmon.

use thiserror::Error;

/// Result type alias using harmon's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for harmon operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// No job record exists for the given digest
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// Blob read/write failed (fatal to a pipeline run)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Content extraction failed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Metadata generation/synthesis failed
    #[error("Generation error: {0}")]
    Generation(String),

    /// Job dispatch/scheduling error
    #[error("Job error: {0}")]
    Job(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
