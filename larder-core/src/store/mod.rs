//! Storage boundary used by the persistence adapter.
//!
//! Only the uniqueness constraints on recipe and tag slugs matter to callers;
//! everything else about the schema stays behind [`RecipeStore`].

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{PersistedRecipe, RecipeDraft, TagRef};

/// Name of the unique constraint on `recipes.slug`.
pub const RECIPE_SLUG_CONSTRAINT: &str = "recipes_slug_key";

/// Name of the unique constraint on `tags.slug`.
pub const TAG_SLUG_CONSTRAINT: &str = "tags_slug_key";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("unique constraint {constraint} violated")]
    UniqueViolation { constraint: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn unique(constraint: &str) -> Self {
        StoreError::UniqueViolation {
            constraint: constraint.to_string(),
        }
    }

    pub fn is_unique_violation_on(&self, name: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint } if constraint == name)
    }
}

/// A recipe ready to be written: slug chosen, tags resolved.
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub owner: Uuid,
    pub slug: String,
    pub draft: RecipeDraft,
    pub tag_ids: Vec<Uuid>,
}

#[async_trait]
pub trait RecipeStore: Send + Sync {
    /// Return `slug` itself when unused, otherwise a variant of it that is
    /// unused at the time of the call. Another writer may still take it first.
    async fn make_unique_slug(&self, slug: &str) -> Result<String, StoreError>;

    /// Insert the recipe with its ingredients, steps and tag links.
    /// Fails with [`StoreError::UniqueViolation`] on [`RECIPE_SLUG_CONSTRAINT`]
    /// when the slug is taken.
    async fn insert_recipe(&self, recipe: &NewRecipe) -> Result<PersistedRecipe, StoreError>;

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<TagRef>, StoreError>;

    /// Fails with [`StoreError::UniqueViolation`] on [`TAG_SLUG_CONSTRAINT`]
    /// when another writer created the tag first.
    async fn create_tag(&self, name: &str, slug: &str) -> Result<TagRef, StoreError>;
}
