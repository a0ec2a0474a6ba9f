use thiserror::Error;

use crate::platform::VideoPlatform;

/// Request-level validation failures. A batch that fails here never starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("urls must contain at least one URL")]
    Empty,

    #[error("a batch may contain at most {max} URLs, got {got}")]
    TooLarge { max: usize, got: usize },
}

#[derive(Error, Debug)]
pub enum ExtractError {
    /// The collaborator answered but reported failure. Carries its message verbatim.
    #[error("{0}")]
    Rejected(String),

    #[error("No extractor configured for {0}")]
    NotConfigured(VideoPlatform),

    #[error("Extraction request failed: {0}")]
    RequestFailed(String),

    #[error("Extraction service returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid extraction response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("{0}")]
    Rejected(String),

    #[error("Generation response did not include a recipe")]
    MissingRecipe,

    #[error("Generation request failed: {0}")]
    RequestFailed(String),

    #[error("Generation service returned {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid recipe payload: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Llm(#[from] crate::llm::LlmError),
}
