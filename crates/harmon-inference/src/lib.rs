//! # harmon-inference
//!
//! Generation backend implementations for harmon.
//!
//! The [`harmon_core::GenerationBackend`] trait is implemented here for a
//! Gemini-style HTTP endpoint ([`GeminiBackend`]) and for a deterministic
//! test double ([`MockGenerationBackend`]). The [`json_block`] module holds
//! the fenced-JSON extraction every consumer of model output runs before
//! parsing.

pub mod gemini;
pub mod json_block;
pub mod mock;

pub use gemini::{GeminiBackend, GeminiConfig};
pub use json_block::extract_json_block;
pub use mock::{MockGenerationBackend, MockOutcome};
