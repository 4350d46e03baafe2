//! # harmon-core
//!
//! Core types, traits, and abstractions for the harmon document processing
//! pipeline.
//!
//! This crate provides the foundational data structures and trait
//! definitions that other harmon crates depend on: the content digest that
//! keys all job state, the job/record data model, collaborator traits
//! (storage, generation, extraction, scheduling), and shared defaults.

pub mod defaults;
pub mod digest;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use digest::ContentDigest;
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
