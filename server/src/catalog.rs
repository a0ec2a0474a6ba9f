//! Read side of the recipe store used by the listing endpoints.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use larder_core::StoreError;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TagSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[async_trait]
pub trait RecipeCatalog: Send + Sync {
    /// The owner's recipes, newest first.
    async fn list_recipes(&self, owner: Uuid) -> Result<Vec<RecipeSummary>, StoreError>;

    /// Tags attached to at least one of the owner's recipes, by name.
    async fn list_tags(&self, owner: Uuid) -> Result<Vec<TagSummary>, StoreError>;
}
