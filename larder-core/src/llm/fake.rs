//! Deterministic provider for tests: answers by prompt substring.

use super::{LlmError, LlmProvider};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

#[derive(Debug)]
pub struct FakeProvider {
    /// (prompt substring, response) pairs, checked in insertion order.
    responses: RwLock<Vec<(String, String)>>,
    default_response: Option<String>,
    calls: AtomicUsize,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            responses: RwLock::new(Vec::new()),
            default_response: Some("{}".to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeProvider {
    /// A provider that errors on any prompt it has no response for.
    pub fn new() -> Self {
        Self {
            default_response: None,
            ..Self::default()
        }
    }

    pub fn with_response(self, prompt_contains: &str, response: &str) -> Self {
        self.add_response(prompt_contains, response);
        self
    }

    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    pub fn add_response(&self, prompt_contains: &str, response: &str) {
        if let Ok(mut responses) = self.responses.write() {
            responses.push((prompt_contains.to_lowercase(), response.to_string()));
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for FakeProvider {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let prompt_lower = prompt.to_lowercase();
        let matched = self
            .responses
            .read()
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?
            .iter()
            .find(|(pattern, _)| prompt_lower.contains(pattern.as_str()))
            .map(|(_, response)| response.clone());

        match matched.or_else(|| self.default_response.clone()) {
            Some(response) => Ok(response),
            None => Err(LlmError::RequestFailed(format!(
                "FakeProvider: no response configured for prompt starting {:?}",
                prompt.chars().take(100).collect::<String>()
            ))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}
