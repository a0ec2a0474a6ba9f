//! Generation collaborators: turn extracted video content into a structured recipe.

mod fake;
mod http;
mod llm;

pub use fake::FakeGenerator;
pub use http::HttpGenerator;
pub use llm::LlmRecipeGenerator;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::GenerateError;
use crate::platform::VideoPlatform;

pub const GENERIC_GENERATE_ERROR: &str = "Failed to generate recipe";

/// Everything a generator is told about one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub video_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub platform: VideoPlatform,
}

#[async_trait]
pub trait RecipeGenerator: Send + Sync + fmt::Debug {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<crate::types::RecipeDraft, GenerateError>;

    fn generator_name(&self) -> &'static str;
}
