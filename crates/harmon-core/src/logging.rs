//! Structured logging schema and field name constants for harmon.
//!
//! All crates use these constants for consistent structured logging fields
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, job completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration (pages, table cells) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Content digest of the upload being operated on.
pub const DIGEST: &str = "digest";

/// Subsystem originating the log event.
/// Values: "store", "inference", "pipeline", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "submit", "poll", "extract", "synthesize"
pub const OPERATION: &str = "op";

// ─── Pipeline fields ───────────────────────────────────────────────────────

/// Pipeline stage name (detection, extraction, cleaning, mapping, scoring,
/// synthesis, lineage).
pub const STAGE: &str = "stage";

/// Detected document type ("digital" / "scanned").
pub const DOC_TYPE: &str = "doc_type";

/// Extraction method label that actually produced the text.
pub const METHOD: &str = "method";

/// Number of pages extracted or cleaned.
pub const PAGE_COUNT: &str = "page_count";

/// Number of tables detected.
pub const TABLE_COUNT: &str = "table_count";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model candidate used for generation.
pub const MODEL: &str = "model";

/// Retry attempt index within one candidate.
pub const ATTEMPT: &str = "attempt";

/// Byte length of a prompt or response.
pub const PROMPT_LEN: &str = "prompt_len";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
