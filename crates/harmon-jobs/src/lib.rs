//! # harmon-jobs
//!
//! The job lifecycle layer of harmon: content-addressed deduplication,
//! the submit/poll state machine, and the scheduling boundary that runs
//! pipelines inline or on a background worker.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use harmon_jobs::{JobDispatcher, PipelineRunner, WorkerConfig, WorkerScheduler};
//! use harmon_store::{MemoryBlobStore, MemoryJobStore};
//!
//! let jobs = Arc::new(MemoryJobStore::new());
//! let blobs = Arc::new(MemoryBlobStore::new());
//! let runner = Arc::new(PipelineRunner::new(jobs.clone(), blobs.clone(), pipeline));
//! let (scheduler, handle) = WorkerScheduler::start(runner, WorkerConfig::from_env());
//! let dispatcher = JobDispatcher::new(jobs, blobs, Arc::new(scheduler));
//!
//! let receipt = dispatcher.submit(&bytes, "survey.pdf", kind).await?;
//! let job = dispatcher.poll(&receipt.digest).await?;
//!
//! handle.shutdown().await?;
//! ```

pub mod dispatcher;
pub mod runner;
pub mod scheduler;

pub use dispatcher::{JobDispatcher, SubmitReceipt};
pub use runner::{PipelineRunner, RunHandler, RunRequest};
pub use scheduler::{InlineScheduler, Scheduler, WorkerConfig, WorkerHandle, WorkerScheduler};
