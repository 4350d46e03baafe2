//! # harmon-store
//!
//! Storage backends for harmon: durable job records keyed by content digest
//! and raw upload blobs keyed by storage key.
//!
//! Three job store backends conform to the same [`harmon_core::JobStore`]
//! contract (in-memory, flat-file JSON, and PostgreSQL) and two blob store
//! backends to [`harmon_core::BlobStore`] (in-memory and local disk). The
//! embedding application chooses backends by constructing them explicitly
//! and handing them to the dispatcher; there is no environment-based
//! dispatch inside this crate.

pub mod blob;
pub mod jobs;
pub mod postgres;

pub use blob::{LocalDiskBlobStore, MemoryBlobStore};
pub use jobs::{JsonFileJobStore, MemoryJobStore};
pub use postgres::PgJobStore;
