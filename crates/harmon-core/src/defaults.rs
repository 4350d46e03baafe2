//! Centralized default constants for harmon.
//!
//! **This module is the single source of truth** for shared default values.
//! All crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// TYPE DETECTION
// =============================================================================

/// Total trimmed text length below which a PDF with embedded images is
/// classified as scanned.
pub const SCANNED_TEXT_THRESHOLD: usize = 200;

/// Per-page text length above which the cheap text-layer read is accepted
/// and the OCR pass for that page is skipped.
pub const OCR_PAGE_SKIP_THRESHOLD: usize = 10;

// =============================================================================
// EXTRACTION
// =============================================================================

/// Per-command timeout for external extraction tools (seconds).
pub const EXTRACTION_CMD_TIMEOUT_SECS: u64 = 60;

/// Default render resolution for OCR page rasterization.
pub const OCR_DPI: u32 = 200;

/// Default OCR language.
pub const OCR_LANGUAGE: &str = "eng";

/// Rows of sample data included in the tabular synthesis prompt.
pub const TABULAR_SAMPLE_ROWS: usize = 5;

// =============================================================================
// CLEANING
// =============================================================================

/// A line occurring on more than this fraction of pages is boilerplate.
pub const BOILERPLATE_LINE_FREQUENCY: f64 = 0.6;

// =============================================================================
// SCORING
// =============================================================================

/// Total text length below which extraction is suspiciously empty.
pub const SPARSE_TEXT_SUSPECT: usize = 50;

/// Total text length below which extraction is probably sparse.
pub const SPARSE_TEXT_PROBABLE: usize = 200;

/// Tables with a whitespace ratio above this are structurally sparse.
pub const TABLE_WHITESPACE_SPARSE: f64 = 0.8;

/// Confidence floor for any non-empty extraction.
pub const CONFIDENCE_FLOOR: f64 = 0.1;

// =============================================================================
// GENERATION
// =============================================================================

/// Default bounded retry count per generation candidate.
pub const GEN_MAX_RETRIES: u32 = 3;

/// Base backoff delay (doubles per attempt) for rate-limit/overload failures.
pub const GEN_BASE_DELAY_MS: u64 = 500;

/// Flat delay before retrying an unclassified generation failure.
pub const GEN_UNKNOWN_DELAY_MS: u64 = 2_000;

/// Timeout for generation HTTP requests (seconds).
pub const GEN_TIMEOUT_SECS: u64 = 120;

/// Document text is truncated to this many chars before prompting.
pub const PROMPT_MAX_CHARS: usize = 100_000;

// =============================================================================
// JOB PROCESSING
// =============================================================================

/// Default maximum concurrent pipeline runs per worker.
pub const WORKER_MAX_CONCURRENT: usize = 4;

/// Default depth of the worker's dispatch queue.
pub const WORKER_QUEUE_DEPTH: usize = 64;
