//! Deterministic embedding provider for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use super::embedding::{EmbeddingProvider, ProviderError};
use crate::core::note::Embedding;

/// Answers from a fixed text-to-vector table and records every request.
#[derive(Default)]
pub struct StubProvider {
    vectors: HashMap<String, Embedding>,
    errors: HashMap<String, ProviderError>,
    fallback: Option<Embedding>,
    always_fail: Option<ProviderError>,
    requests: Mutex<Vec<String>>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails with `error`.
    pub fn failing(error: ProviderError) -> Self {
        Self {
            always_fail: Some(error),
            ..Self::default()
        }
    }

    pub fn with_vector(mut self, text: &str, vector: Embedding) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub fn with_error(mut self, text: &str, error: ProviderError) -> Self {
        self.errors.insert(text.to_string(), error);
        self
    }

    /// Vector returned for texts without an explicit entry.
    pub fn with_default(mut self, vector: Embedding) -> Self {
        self.fallback = Some(vector);
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn texts(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl EmbeddingProvider for StubProvider {
    fn model_id(&self) -> &str {
        "stub"
    }

    fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        self.requests.lock().unwrap().push(text.to_string());

        if let Some(error) = &self.always_fail {
            return Err(error.clone());
        }
        if let Some(error) = self.errors.get(text) {
            return Err(error.clone());
        }
        self.vectors
            .get(text)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| ProviderError::Decode(format!("no stub vector for '{}'", text)))
    }
}
