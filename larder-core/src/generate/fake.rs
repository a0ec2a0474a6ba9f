use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::{GenerationRequest, RecipeGenerator};
use crate::error::GenerateError;
use crate::types::{DraftIngredient, DraftIngredients, RecipeDraft};

/// Deterministic generator for tests.
///
/// Names the recipe after the video title (or an override) and attaches the
/// configured tags. Titles registered with [`FakeGenerator::fail_for`] fail.
#[derive(Debug, Default)]
pub struct FakeGenerator {
    tags: Vec<String>,
    names: HashMap<String, String>,
    failures: HashMap<String, Option<String>>,
    calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Use `name` as the recipe name for videos titled `title`.
    pub fn with_name_for(mut self, title: &str, name: &str) -> Self {
        self.names.insert(title.to_string(), name.to_string());
        self
    }

    /// `None` fails with a missing recipe, `Some` with that message.
    pub fn fail_for(mut self, title: &str, error: Option<&str>) -> Self {
        self.failures
            .insert(title.to_string(), error.map(str::to_string));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecipeGenerator for FakeGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<RecipeDraft, GenerateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(failure) = self.failures.get(&request.title) {
            return Err(match failure {
                Some(message) => GenerateError::Rejected(message.clone()),
                None => GenerateError::MissingRecipe,
            });
        }

        let name = self
            .names
            .get(&request.title)
            .cloned()
            .unwrap_or_else(|| request.title.clone());

        Ok(RecipeDraft {
            name,
            description: Some(request.description.clone()).filter(|d| !d.is_empty()),
            servings: Some(2),
            ingredients: DraftIngredients::Flat(vec![DraftIngredient {
                name: "salt".to_string(),
                quantity: Some("1".to_string()),
                unit: Some("pinch".to_string()),
                note: None,
            }]),
            steps: vec!["Cook it.".to_string()],
            tags: self.tags.clone(),
            ..Default::default()
        })
    }

    fn generator_name(&self) -> &'static str {
        "fake"
    }
}
