//! # harmon-pipeline
//!
//! The multi-stage document processing pipeline: type detection, branched
//! extraction with fallback chains, boilerplate cleaning, schema mapping,
//! confidence scoring, LLM metadata synthesis with candidate fallback, and
//! lineage stamping. Each stage is fault-isolated so partial failures
//! degrade the output instead of aborting the run.

pub mod cleaner;
pub mod confidence;
pub mod extract;
pub mod pipeline;
pub mod prompts;
pub mod schema_map;
pub mod synthesizer;

pub use extract::{
    CommandTableExtractor, CsvTabularExtractor, NullTableExtractor, PopplerTextExtractor,
    PopplerTypeDetector, TabularExtraction, TesseractOcrExtractor,
};
pub use pipeline::{Pipeline, PipelineReport, StageError};
pub use synthesizer::{MetadataSynthesizer, SynthesisFailure, SynthesizerConfig};
