//! LLM provider abstraction used by the LLM-backed recipe generator.

mod claude;
mod fake;

pub use claude::ClaudeProvider;
pub use fake::FakeProvider;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    RequestFailed(String),

    #[error("API returned error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Rate limited, retry after {retry_after_secs:?} seconds")]
    RateLimited { retry_after_secs: Option<u64> },
}

/// A text-completion backend. Implementations must be safe to share between
/// concurrently running import tasks.
#[async_trait]
pub trait LlmProvider: Send + Sync + fmt::Debug {
    /// Send a system instruction and a user prompt, returning the model's text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;

    fn provider_name(&self) -> &'static str;

    fn model_name(&self) -> &str;
}
