//! Persistence adapter: slug selection with conflict retry and tag get-or-create.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::slug::{recipe_slug_candidate, slugify};
use crate::store::{NewRecipe, RecipeStore, StoreError, RECIPE_SLUG_CONSTRAINT, TAG_SLUG_CONSTRAINT};
use crate::types::{PersistedRecipe, RecipeDraft};

/// Total insert attempts per recipe, including the first.
pub const MAX_SLUG_ATTEMPTS: u32 = 3;

/// Base delay after a slug conflict; attempt `n` waits `n` times this.
pub const SLUG_RETRY_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("could not find a free slug after {attempts} attempts")]
    SlugConflict { attempts: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct RecipePersister {
    store: Arc<dyn RecipeStore>,
    backoff: Duration,
}

impl RecipePersister {
    pub fn new(store: Arc<dyn RecipeStore>) -> Self {
        Self {
            store,
            backoff: SLUG_RETRY_BACKOFF,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Save `draft` for `owner`, retrying the whole slug-then-insert sequence
    /// when a concurrent writer takes the slug first.
    pub async fn persist(
        &self,
        owner: Uuid,
        draft: &RecipeDraft,
    ) -> Result<PersistedRecipe, PersistError> {
        let tag_ids = self.convert_tags_to_ids(&draft.tags).await?;

        let mut recipe = NewRecipe {
            owner,
            slug: String::new(),
            draft: draft.clone(),
            tag_ids,
        };

        for attempt in 1..=MAX_SLUG_ATTEMPTS {
            let candidate = recipe_slug_candidate(&draft.name);
            recipe.slug = self.store.make_unique_slug(&candidate).await?;

            match self.store.insert_recipe(&recipe).await {
                Ok(persisted) => {
                    tracing::debug!(
                        slug = %persisted.slug,
                        attempt,
                        ingredients = draft.ingredients.ingredient_count(),
                        steps = draft.steps.len(),
                        "Recipe saved"
                    );
                    return Ok(persisted);
                }
                Err(e) if e.is_unique_violation_on(RECIPE_SLUG_CONSTRAINT) => {
                    tracing::warn!(
                        slug = %recipe.slug,
                        attempt,
                        max_attempts = MAX_SLUG_ATTEMPTS,
                        "Slug taken by a concurrent insert"
                    );
                    if attempt < MAX_SLUG_ATTEMPTS {
                        tokio::time::sleep(self.backoff * attempt).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(PersistError::SlugConflict {
            attempts: MAX_SLUG_ATTEMPTS,
        })
    }

    /// Resolve free-text tag names to tag ids, creating missing tags.
    ///
    /// Names that normalize to the same slug resolve to one id. Names with no
    /// sluggable characters are skipped.
    pub async fn convert_tags_to_ids(&self, names: &[String]) -> Result<Vec<Uuid>, StoreError> {
        let mut seen = HashSet::new();
        let mut ids = Vec::with_capacity(names.len());

        for name in names {
            let name = name.trim();
            let slug = slugify(name);
            if slug.is_empty() || !seen.insert(slug.clone()) {
                continue;
            }
            ids.push(self.get_or_create_tag(name, &slug).await?);
        }

        Ok(ids)
    }

    async fn get_or_create_tag(&self, name: &str, slug: &str) -> Result<Uuid, StoreError> {
        if let Some(tag) = self.store.find_tag_by_slug(slug).await? {
            return Ok(tag.id);
        }

        match self.store.create_tag(name, slug).await {
            Ok(tag) => Ok(tag.id),
            Err(e) if e.is_unique_violation_on(TAG_SLUG_CONSTRAINT) => {
                tracing::debug!(slug, "Tag created concurrently, re-reading");
                self.store
                    .find_tag_by_slug(slug)
                    .await?
                    .map(|tag| tag.id)
                    .ok_or(e)
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for RecipePersister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipePersister")
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}
