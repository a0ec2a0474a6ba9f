use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::{NewRecipe, RecipeStore, StoreError, RECIPE_SLUG_CONSTRAINT, TAG_SLUG_CONSTRAINT};
use crate::types::{PersistedRecipe, RecipeDraft, TagRef};

#[derive(Debug, Clone)]
pub struct StoredRecipe {
    pub id: Uuid,
    pub owner: Uuid,
    pub slug: String,
    pub draft: RecipeDraft,
    pub tag_ids: Vec<Uuid>,
}

#[derive(Debug, Default)]
struct Inner {
    recipes: Vec<StoredRecipe>,
    tags: HashMap<String, TagRef>,
    /// Recipe inserts that will fail with a slug violation before touching state.
    forced_slug_conflicts: usize,
    /// Tag slugs whose next `find` misses even though a concurrent writer is
    /// about to create them.
    tag_races: Vec<String>,
}

/// In-memory [`RecipeStore`] enforcing the same slug uniqueness as the
/// database, with hooks for injecting write races.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    latency: Duration,
    insert_attempts: AtomicUsize,
    tag_creates: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every store call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make the next `n` recipe inserts fail as if another writer had just
    /// claimed the slug.
    pub fn fail_next_recipe_inserts(&self, n: usize) {
        self.lock().forced_slug_conflicts = n;
    }

    /// Simulate a writer that creates tag `slug` between our lookup and our
    /// insert: the next lookup misses, and the tag then exists.
    pub fn race_tag_creation(&self, slug: &str) {
        self.lock().tag_races.push(slug.to_string());
    }

    pub fn insert_attempts(&self) -> usize {
        self.insert_attempts.load(Ordering::SeqCst)
    }

    /// Successful tag creations.
    pub fn tag_creates(&self) -> usize {
        self.tag_creates.load(Ordering::SeqCst)
    }

    pub fn tag_count(&self) -> usize {
        self.lock().tags.len()
    }

    pub fn tag(&self, slug: &str) -> Option<TagRef> {
        self.lock().tags.get(slug).cloned()
    }

    pub fn tags(&self) -> Vec<TagRef> {
        self.lock().tags.values().cloned().collect()
    }

    pub fn recipes(&self) -> Vec<StoredRecipe> {
        self.lock().recipes.clone()
    }

    pub fn recipes_for(&self, owner: Uuid) -> Vec<StoredRecipe> {
        self.lock()
            .recipes
            .iter()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panicking test thread must not hide the store from the rest of the test.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl RecipeStore for MemoryStore {
    async fn make_unique_slug(&self, slug: &str) -> Result<String, StoreError> {
        self.pause().await;
        let inner = self.lock();
        let taken = |s: &str| inner.recipes.iter().any(|r| r.slug == s);

        if !taken(slug) {
            return Ok(slug.to_string());
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", slug, n);
            if !taken(&candidate) {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    async fn insert_recipe(&self, recipe: &NewRecipe) -> Result<PersistedRecipe, StoreError> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        let mut inner = self.lock();

        if inner.forced_slug_conflicts > 0 {
            inner.forced_slug_conflicts -= 1;
            return Err(StoreError::unique(RECIPE_SLUG_CONSTRAINT));
        }
        if inner.recipes.iter().any(|r| r.slug == recipe.slug) {
            return Err(StoreError::unique(RECIPE_SLUG_CONSTRAINT));
        }

        let id = Uuid::new_v4();
        inner.recipes.push(StoredRecipe {
            id,
            owner: recipe.owner,
            slug: recipe.slug.clone(),
            draft: recipe.draft.clone(),
            tag_ids: recipe.tag_ids.clone(),
        });

        Ok(PersistedRecipe {
            id,
            slug: recipe.slug.clone(),
        })
    }

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<TagRef>, StoreError> {
        self.pause().await;
        let mut inner = self.lock();

        if let Some(pos) = inner.tag_races.iter().position(|s| s == slug) {
            inner.tag_races.remove(pos);
            if !inner.tags.contains_key(slug) {
                let rival = TagRef {
                    id: Uuid::new_v4(),
                    name: slug.to_string(),
                    slug: slug.to_string(),
                };
                inner.tags.insert(slug.to_string(), rival);
            }
            return Ok(None);
        }

        Ok(inner.tags.get(slug).cloned())
    }

    async fn create_tag(&self, name: &str, slug: &str) -> Result<TagRef, StoreError> {
        self.pause().await;
        let mut inner = self.lock();

        if inner.tags.contains_key(slug) {
            return Err(StoreError::unique(TAG_SLUG_CONSTRAINT));
        }

        let tag = TagRef {
            id: Uuid::new_v4(),
            name: name.to_string(),
            slug: slug.to_string(),
        };
        inner.tags.insert(slug.to_string(), tag.clone());
        self.tag_creates.fetch_add(1, Ordering::SeqCst);
        Ok(tag)
    }
}
