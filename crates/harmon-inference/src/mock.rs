//! Mock generation backend for deterministic testing.
//!
//! Outcomes are scripted per model, either as a constant or as a consumed
//! sequence, and every call is logged so tests can assert exact attempt
//! counts per candidate (retry budgets, fallback order, idempotence).

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use harmon_core::{GenerationBackend, GenerationError, Result};

/// One scripted generation outcome.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Ok(String),
    Err(GenerationError),
}

#[derive(Debug, Clone)]
enum Plan {
    Always(MockOutcome),
    /// Pop outcomes in order; exhaustion yields `Unknown`.
    Sequence(Arc<Mutex<VecDeque<MockOutcome>>>),
}

/// One logged generation call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub model: String,
    pub prompt: String,
}

/// Mock [`GenerationBackend`] with per-model scripted outcomes.
#[derive(Clone, Default)]
pub struct MockGenerationBackend {
    candidates: Vec<String>,
    plans: HashMap<String, Plan>,
    default_response: Option<String>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

impl MockGenerationBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the candidate list returned by `list_candidates`.
    pub fn with_candidates<S: Into<String>>(mut self, candidates: Vec<S>) -> Self {
        self.candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    /// Script a model to always return the given text.
    pub fn with_response(mut self, model: impl Into<String>, text: impl Into<String>) -> Self {
        self.plans
            .insert(model.into(), Plan::Always(MockOutcome::Ok(text.into())));
        self
    }

    /// Script a model to always fail with the given error.
    pub fn with_failure(mut self, model: impl Into<String>, err: GenerationError) -> Self {
        self.plans
            .insert(model.into(), Plan::Always(MockOutcome::Err(err)));
        self
    }

    /// Script a model with an ordered outcome sequence.
    pub fn with_sequence(mut self, model: impl Into<String>, outcomes: Vec<MockOutcome>) -> Self {
        self.plans.insert(
            model.into(),
            Plan::Sequence(Arc::new(Mutex::new(outcomes.into()))),
        );
        self
    }

    /// Fallback response for models without a script.
    pub fn with_default_response(mut self, text: impl Into<String>) -> Self {
        self.default_response = Some(text.into());
        self
    }

    /// All logged calls, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    /// Total generation calls across all models.
    pub fn generate_call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    /// Generation calls made against one model.
    pub fn calls_for(&self, model: &str) -> usize {
        self.call_log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.model == model)
            .count()
    }
}

#[async_trait]
impl GenerationBackend for MockGenerationBackend {
    async fn list_candidates(&self) -> Result<Vec<String>> {
        Ok(self.candidates.clone())
    }

    async fn generate(
        &self,
        model: &str,
        prompt: &str,
    ) -> std::result::Result<String, GenerationError> {
        self.call_log.lock().unwrap().push(MockCall {
            model: model.to_string(),
            prompt: prompt.to_string(),
        });

        let outcome = match self.plans.get(model) {
            Some(Plan::Always(outcome)) => outcome.clone(),
            Some(Plan::Sequence(queue)) => queue.lock().unwrap().pop_front().unwrap_or_else(|| {
                MockOutcome::Err(GenerationError::Unknown(format!(
                    "mock sequence exhausted for '{}'",
                    model
                )))
            }),
            None => match &self.default_response {
                Some(text) => MockOutcome::Ok(text.clone()),
                None => MockOutcome::Err(GenerationError::Unknown(format!(
                    "no mock script for model '{}'",
                    model
                ))),
            },
        };

        match outcome {
            MockOutcome::Ok(text) => Ok(text),
            MockOutcome::Err(err) => Err(err),
        }
    }
}
