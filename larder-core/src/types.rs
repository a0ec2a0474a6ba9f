use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BatchError;

/// Hard cap on URLs per batch.
pub const MAX_BATCH_SIZE: usize = 20;

/// The validated list of URLs submitted in one request, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBatch {
    urls: Vec<String>,
}

impl ImportBatch {
    pub fn new(urls: Vec<String>) -> Result<Self, BatchError> {
        if urls.is_empty() {
            return Err(BatchError::Empty);
        }
        if urls.len() > MAX_BATCH_SIZE {
            return Err(BatchError::TooLarge {
                max: MAX_BATCH_SIZE,
                got: urls.len(),
            });
        }

        Ok(Self {
            urls: urls.into_iter().map(|u| u.trim().to_string()).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn into_urls(self) -> Vec<String> {
        self.urls
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// One URL's pipeline execution. `index` is the position in the submitted batch
/// and is the only stable key, since tasks finish out of order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTask {
    pub index: usize,
    pub url: String,
    pub status: TaskStatus,
}

impl ImportTask {
    pub fn new(index: usize, url: impl Into<String>) -> Self {
        Self {
            index,
            url: url.into(),
            status: TaskStatus::Pending,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = TaskStatus::Running;
    }

    pub fn mark_finished(&mut self, result: &ImportResult) {
        self.status = if result.success {
            TaskStatus::Succeeded
        } else {
            TaskStatus::Failed
        };
    }
}

/// Outcome of one task. Produced exactly once per [`ImportTask`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub index: usize,
    pub url: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ImportResult {
    pub fn succeeded(task: &ImportTask, recipe_name: impl Into<String>) -> Self {
        Self {
            index: task.index,
            url: task.url.clone(),
            success: true,
            recipe_name: Some(recipe_name.into()),
            error: None,
        }
    }

    pub fn failed(task: &ImportTask, error: impl Into<String>) -> Self {
        Self {
            index: task.index,
            url: task.url.clone(),
            success: false,
            recipe_name: None,
            error: Some(error.into()),
        }
    }
}

/// Raw content pulled from a video by an extraction collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ExtractedContentWire")]
pub struct ExtractedContent {
    pub title: String,
    pub description: String,
    /// YouTube returns a transcript; TikTok only has the caption text.
    pub transcript: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Wire shape from extractors, which may send `transcript`, `descriptionText` or both.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractedContentWire {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default)]
    description_text: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    author: Option<String>,
}

impl From<ExtractedContentWire> for ExtractedContent {
    fn from(wire: ExtractedContentWire) -> Self {
        ExtractedContent {
            title: wire.title,
            description: wire.description,
            transcript: wire.transcript.or(wire.description_text),
            thumbnail_url: wire.thumbnail_url,
            author: wire.author,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftIngredient {
    #[serde(alias = "item")]
    pub name: String,
    #[serde(default, alias = "amount", skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngredientGroup {
    pub name: String,
    #[serde(default)]
    pub ingredients: Vec<DraftIngredient>,
}

/// A draft has either a flat ingredient list or named groups, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DraftIngredients {
    #[serde(rename = "ingredients")]
    Flat(Vec<DraftIngredient>),
    #[serde(rename = "ingredientGroups")]
    Grouped(Vec<IngredientGroup>),
}

impl Default for DraftIngredients {
    fn default() -> Self {
        DraftIngredients::Flat(Vec::new())
    }
}

impl DraftIngredients {
    pub fn ingredient_count(&self) -> usize {
        match self {
            DraftIngredients::Flat(items) => items.len(),
            DraftIngredients::Grouped(groups) => groups.iter().map(|g| g.ingredients.len()).sum(),
        }
    }
}

/// Structured recipe produced by the generation collaborator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RecipeDraftWire")]
pub struct RecipeDraft {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cook_minutes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_minutes: Option<u32>,
    #[serde(flatten)]
    pub ingredients: DraftIngredients,
    pub steps: Vec<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// Wire shape accepted from generators, where both ingredient keys may appear.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecipeDraftWire {
    name: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    servings: Option<u32>,
    #[serde(default)]
    prep_minutes: Option<u32>,
    #[serde(default)]
    cook_minutes: Option<u32>,
    #[serde(default)]
    total_minutes: Option<u32>,
    #[serde(default)]
    ingredients: Vec<DraftIngredient>,
    #[serde(default)]
    ingredient_groups: Vec<IngredientGroup>,
    #[serde(default)]
    steps: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    source_url: Option<String>,
}

impl From<RecipeDraftWire> for RecipeDraft {
    fn from(wire: RecipeDraftWire) -> Self {
        // Groups win when a generator sends both shapes.
        let ingredients = if wire.ingredient_groups.is_empty() {
            DraftIngredients::Flat(wire.ingredients)
        } else {
            DraftIngredients::Grouped(wire.ingredient_groups)
        };

        RecipeDraft {
            name: wire.name,
            category: wire.category,
            description: wire.description,
            servings: wire.servings,
            prep_minutes: wire.prep_minutes,
            cook_minutes: wire.cook_minutes,
            total_minutes: wire.total_minutes,
            ingredients,
            steps: wire.steps,
            tags: wire.tags,
            image_url: wire.image_url,
            video_url: wire.video_url,
            source_url: wire.source_url,
        }
    }
}

/// Durable identity assigned to a saved recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedRecipe {
    pub id: Uuid,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}
