//! Gemini-style REST generation backend.
//!
//! Speaks the `v1beta/models/{model}:generateContent` wire shape. Model
//! listing is filtered and ordered by a preference table so the most
//! reliable (highest-quota) candidates come first; failure classification
//! maps HTTP status codes onto [`GenerationError`] so the synthesizer's
//! retry policy never has to string-match provider messages.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use harmon_core::defaults::GEN_TIMEOUT_SECS;
use harmon_core::{Error, GenerationBackend, GenerationError, Result};

/// Default public endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Hardcoded preference order: flash-class models first, they carry the
/// highest rate limits.
const PREFERRED_MODELS: [&str; 6] = [
    "gemini-1.5-flash",
    "gemini-1.5-flash-001",
    "gemini-1.5-pro",
    "gemini-1.0-pro",
    "gemini-1.5-flash-8b",
    "gemini-pro",
];

/// Specialized model families that cannot serve plain text generation.
const EXCLUDED_KEYWORDS: [&str; 9] = [
    "vision",
    "embedding",
    "tts",
    "audio",
    "robotics",
    "computer-use",
    "image-generation",
    "imagen",
    "medlm",
];

/// Configuration for [`GeminiBackend`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: String,
    /// Static candidate override. When non-empty, `list_candidates` returns
    /// this list verbatim and never calls the models endpoint.
    pub candidates: Vec<String>,
    pub timeout_secs: u64,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            candidates: Vec::new(),
            timeout_secs: GEN_TIMEOUT_SECS,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<String>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Build from environment: `GEMINI_API_KEY` (required),
    /// `GEMINI_BASE_URL` (optional).
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| Error::Config("GEMINI_API_KEY is not set".to_string()))?;
        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }
}

/// HTTP generation backend for a Gemini-style endpoint.
pub struct GeminiBackend {
    client: Client,
    config: GeminiConfig,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
    #[serde(default, rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct ResponseCandidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct PromptFeedback {
    #[serde(default, rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    name: String,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        info!(base_url = %config.base_url, "Initializing Gemini backend");
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env()?)
    }

    /// Order available models: preferred names first, then remaining
    /// generation-capable gemini models, specialized families excluded.
    fn prioritize(available: &[String]) -> Vec<String> {
        let short = |name: &str| name.trim_start_matches("models/").to_string();
        let mut candidates: Vec<String> = Vec::new();

        for pref in PREFERRED_MODELS {
            if available.iter().any(|n| short(n) == pref) {
                candidates.push(pref.to_string());
            }
        }

        for name in available {
            let name = short(name);
            if !name.contains("gemini") || candidates.contains(&name) {
                continue;
            }
            if EXCLUDED_KEYWORDS.iter().any(|kw| name.contains(kw)) {
                continue;
            }
            candidates.push(name);
        }

        if candidates.is_empty() {
            candidates.push(PREFERRED_MODELS[0].to_string());
        }
        candidates
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn list_candidates(&self) -> Result<Vec<String>> {
        if !self.config.candidates.is_empty() {
            return Ok(self.config.candidates.clone());
        }

        let url = format!(
            "{}/v1beta/models?key={}",
            self.config.base_url, self.config.api_key
        );
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                // Listing is advisory; fall back to the static preference
                // head rather than failing the whole synthesis.
                warn!(error = %e, "Model listing failed, defaulting to flash");
                return Ok(vec![PREFERRED_MODELS[0].to_string()]);
            }
        };
        if !response.status().is_success() {
            warn!(status = %response.status(), "Model listing failed, defaulting to flash");
            return Ok(vec![PREFERRED_MODELS[0].to_string()]);
        }

        let list: ModelList = response.json().await?;
        let available: Vec<String> = list.models.into_iter().map(|m| m.name).collect();
        let candidates = Self::prioritize(&available);
        debug!(count = candidates.len(), "Prioritized model candidates");
        Ok(candidates)
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> std::result::Result<String, GenerationError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.base_url, model, self.config.api_key
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Unknown(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited(detail),
                StatusCode::SERVICE_UNAVAILABLE => GenerationError::Overloaded(detail),
                StatusCode::BAD_REQUEST => GenerationError::InvalidInput(detail),
                _ => GenerationError::Unknown(format!("{}: {}", status, detail)),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Unknown(format!("unparseable response: {}", e)))?;

        if let Some(feedback) = parsed.prompt_feedback {
            if let Some(reason) = feedback.block_reason {
                return Err(GenerationError::Blocked(reason));
            }
        }

        let text: String = parsed
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::Blocked(
                "model returned no text".to_string(),
            ));
        }
        Ok(text)
    }
}
