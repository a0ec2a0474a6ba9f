use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::{GenerationRequest, RecipeGenerator, GENERIC_GENERATE_ERROR};
use crate::error::GenerateError;
use crate::types::RecipeDraft;

/// Posts a [`GenerationRequest`] to a recipe generation service.
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GenerateEnvelope {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    recipe: Option<RecipeDraft>,
}

impl GenerateEnvelope {
    fn into_draft(self) -> Result<RecipeDraft, GenerateError> {
        if !self.success {
            return Err(GenerateError::Rejected(
                self.error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| GENERIC_GENERATE_ERROR.to_string()),
            ));
        }
        self.recipe.ok_or(GenerateError::MissingRecipe)
    }
}

impl HttpGenerator {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, GenerateError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| GenerateError::RequestFailed(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }
}

#[async_trait]
impl RecipeGenerator for HttpGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<RecipeDraft, GenerateError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| GenerateError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerateError::RequestFailed(e.to_string()))?;

        match serde_json::from_str::<GenerateEnvelope>(&body) {
            Ok(envelope) => envelope.into_draft(),
            Err(_) if !status.is_success() => Err(GenerateError::ApiError {
                status: status.as_u16(),
                message: body,
            }),
            Err(e) => Err(GenerateError::InvalidResponse(e.to_string())),
        }
    }

    fn generator_name(&self) -> &'static str {
        "http"
    }
}
