//! Metadata synthesis: candidate fallback with bounded retry and backoff.
//!
//! Candidates are tried most-preferred first. Within one candidate,
//! rate-limit and overload failures back off exponentially with jitter
//! (separate quota buckets mean the *next* candidate may succeed
//! immediately, so budgets stay small); malformed-input and blocked
//! responses abandon the candidate at once. The first response whose body
//! parses into a valid record wins. Nothing thrown here escapes the
//! synthesis boundary: exhaustion comes back as a structured failure the
//! pipeline folds into an error-shaped record.

use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use harmon_core::defaults::{GEN_BASE_DELAY_MS, GEN_MAX_RETRIES, GEN_UNKNOWN_DELAY_MS};
use harmon_core::{GenerationBackend, GenerationError, MetadataRecord};
use harmon_inference::extract_json_block;

/// Retry/backoff policy for one synthesis call.
#[derive(Debug, Clone)]
pub struct SynthesizerConfig {
    /// Bounded attempts per candidate.
    pub max_retries: u32,
    /// Base backoff delay; doubles per attempt for rate-limit/overload.
    pub base_delay_ms: u64,
    /// Flat delay before retrying an unclassified failure.
    pub unknown_delay_ms: u64,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            max_retries: GEN_MAX_RETRIES,
            base_delay_ms: GEN_BASE_DELAY_MS,
            unknown_delay_ms: GEN_UNKNOWN_DELAY_MS,
        }
    }
}

impl SynthesizerConfig {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    pub fn with_unknown_delay_ms(mut self, unknown_delay_ms: u64) -> Self {
        self.unknown_delay_ms = unknown_delay_ms;
        self
    }
}

/// Structured failure descriptor returned when every candidate failed.
#[derive(Debug, Clone)]
pub struct SynthesisFailure {
    pub error: String,
    pub details: String,
}

impl std::fmt::Display for SynthesisFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.details)
    }
}

/// Drives the generation backend to a `MetadataRecord`.
pub struct MetadataSynthesizer {
    backend: Arc<dyn GenerationBackend>,
    config: SynthesizerConfig,
}

impl MetadataSynthesizer {
    pub fn new(backend: Arc<dyn GenerationBackend>, config: SynthesizerConfig) -> Self {
        Self { backend, config }
    }

    /// Synthesize a metadata record from a prepared prompt.
    pub async fn synthesize(
        &self,
        prompt: &str,
    ) -> std::result::Result<MetadataRecord, SynthesisFailure> {
        let start = Instant::now();

        let candidates = match self.backend.list_candidates().await {
            Ok(candidates) if !candidates.is_empty() => candidates,
            Ok(_) => {
                return Err(SynthesisFailure {
                    error: "No generation candidates available".to_string(),
                    details: "candidate list was empty".to_string(),
                })
            }
            Err(e) => {
                return Err(SynthesisFailure {
                    error: "Failed to list generation candidates".to_string(),
                    details: e.to_string(),
                })
            }
        };
        debug!(candidates = candidates.len(), prompt_len = prompt.len(), "Starting synthesis");

        let mut last_error = String::new();
        for model in &candidates {
            match self.generate_with_retry(model, prompt).await {
                Ok(text) => match parse_record(&text) {
                    Ok(record) => {
                        info!(
                            model = %model,
                            duration_ms = start.elapsed().as_millis() as u64,
                            "Synthesis succeeded"
                        );
                        return Ok(record);
                    }
                    Err(reason) => {
                        warn!(model = %model, %reason, "Candidate produced unusable output");
                        last_error = format!("{}: {}", model, reason);
                    }
                },
                Err(e) => {
                    warn!(model = %model, error = %e, "Candidate abandoned");
                    last_error = format!("{}: {}", model, e);
                }
            }
        }

        Err(SynthesisFailure {
            error: "All models failed".to_string(),
            details: last_error,
        })
    }

    /// Retry one candidate within its bounded budget.
    async fn generate_with_retry(
        &self,
        model: &str,
        prompt: &str,
    ) -> std::result::Result<String, GenerationError> {
        let max = self.config.max_retries;
        for attempt in 0..max {
            match self.backend.generate(model, prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_backoff() => {
                    if attempt + 1 == max {
                        return Err(e);
                    }
                    let wait = self.backoff_delay(attempt);
                    warn!(
                        model,
                        attempt = attempt + 1,
                        max,
                        wait_ms = wait.as_millis() as u64,
                        "Rate limit/overload, backing off"
                    );
                    sleep(wait).await;
                }
                Err(e @ (GenerationError::InvalidInput(_) | GenerationError::Blocked(_))) => {
                    // Retrying an incompatible request or a blocked prompt
                    // cannot succeed on this candidate.
                    return Err(e);
                }
                Err(e) => {
                    if attempt + 1 == max {
                        return Err(e);
                    }
                    sleep(Duration::from_millis(self.config.unknown_delay_ms)).await;
                }
            }
        }
        Err(GenerationError::Unknown("retry budget was zero".to_string()))
    }

    /// Exponential backoff with uniform jitter: `base × 2^attempt + U(0, base)`.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.base_delay_ms;
        let exp = base.saturating_mul(1u64 << attempt.min(16));
        let jitter = if base > 0 {
            rand::thread_rng().gen_range(0..base)
        } else {
            0
        };
        Duration::from_millis(exp + jitter)
    }
}

/// Strip fence markup and parse the body into a record.
fn parse_record(text: &str) -> std::result::Result<MetadataRecord, String> {
    let block = extract_json_block(text).ok_or_else(|| "no JSON block in response".to_string())?;
    serde_json::from_str::<MetadataRecord>(block)
        .map_err(|e| format!("metadata JSON did not match the record shape: {}", e))
}
