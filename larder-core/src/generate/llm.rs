use std::sync::Arc;

use async_trait::async_trait;

use super::{GenerationRequest, RecipeGenerator};
use crate::error::GenerateError;
use crate::llm::LlmProvider;
use crate::types::RecipeDraft;

const SYSTEM_PROMPT: &str = "You turn cooking videos into recipes. \
Respond with a single JSON object and nothing else. Fields: \
name (string), category (string), description (string), servings (integer), \
prepMinutes, cookMinutes, totalMinutes (integers), \
ingredients (array of {name, quantity, unit, note}) OR ingredientGroups \
(array of {name, ingredients}), steps (array of strings), tags (array of short lowercase strings). \
Omit fields you cannot determine. If the video contains no recipe, respond with {\"error\": \"<reason>\"}.";

/// Longest transcript excerpt sent to the model.
const MAX_TRANSCRIPT_CHARS: usize = 12_000;

/// Generates recipes by prompting an [`LlmProvider`] directly.
#[derive(Debug, Clone)]
pub struct LlmRecipeGenerator {
    provider: Arc<dyn LlmProvider>,
}

impl LlmRecipeGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

fn render_prompt(request: &GenerationRequest) -> String {
    let mut prompt = format!(
        "Platform: {}\nVideo: {}\nTitle: {}\n",
        request.platform, request.video_url, request.title
    );
    if let Some(author) = &request.author {
        prompt.push_str(&format!("Author: {}\n", author));
    }
    if !request.description.trim().is_empty() {
        prompt.push_str(&format!("\nDescription:\n{}\n", request.description.trim()));
    }
    if let Some(transcript) = request.transcript.as_deref().map(str::trim) {
        if !transcript.is_empty() {
            let excerpt: String = transcript.chars().take(MAX_TRANSCRIPT_CHARS).collect();
            prompt.push_str(&format!("\nTranscript:\n{}\n", excerpt));
        }
    }
    prompt
}

/// Pull the outermost JSON object out of a model reply, tolerating code fences
/// and chatter around it.
fn json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

fn parse_reply(reply: &str) -> Result<RecipeDraft, GenerateError> {
    let json = json_object(reply)
        .ok_or_else(|| GenerateError::InvalidResponse("no JSON object in reply".to_string()))?;
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| GenerateError::InvalidResponse(e.to_string()))?;

    if value.get("name").is_none() {
        return match value.get("error").and_then(|e| e.as_str()) {
            Some(reason) => Err(GenerateError::Rejected(reason.to_string())),
            None => Err(GenerateError::MissingRecipe),
        };
    }

    let draft: RecipeDraft =
        serde_json::from_value(value).map_err(|e| GenerateError::InvalidResponse(e.to_string()))?;
    if draft.name.trim().is_empty() {
        return Err(GenerateError::MissingRecipe);
    }
    Ok(draft)
}

#[async_trait]
impl RecipeGenerator for LlmRecipeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<RecipeDraft, GenerateError> {
        let prompt = render_prompt(request);
        let reply = self.provider.complete(SYSTEM_PROMPT, &prompt).await?;

        tracing::debug!(
            provider = self.provider.provider_name(),
            model = self.provider.model_name(),
            reply_len = reply.len(),
            "LLM reply received"
        );

        parse_reply(&reply)
    }

    fn generator_name(&self) -> &'static str {
        "llm"
    }
}
