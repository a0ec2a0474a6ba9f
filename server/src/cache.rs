//! Per-user memoization of listing views, evicted when an import lands.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use larder_core::{CacheInvalidator, ListingView, StoreError};
use uuid::Uuid;

use crate::catalog::{RecipeCatalog, RecipeSummary, TagSummary};

struct CachedView<T> {
    entries: DashMap<Uuid, Arc<Vec<T>>>,
    /// Bumped on every invalidation so a load that started before it is not cached.
    generations: DashMap<Uuid, u64>,
}

impl<T> CachedView<T> {
    fn new() -> Self {
        Self {
            entries: DashMap::new(),
            generations: DashMap::new(),
        }
    }

    fn get(&self, owner: Uuid) -> Option<Arc<Vec<T>>> {
        self.entries.get(&owner).map(|entry| entry.value().clone())
    }

    fn generation(&self, owner: Uuid) -> u64 {
        self.generations.get(&owner).map(|g| *g).unwrap_or(0)
    }

    fn store(&self, owner: Uuid, loaded_at: u64, value: Arc<Vec<T>>) {
        let generation = self.generations.entry(owner).or_insert(0);
        if *generation == loaded_at {
            self.entries.insert(owner, value);
        }
    }

    fn invalidate(&self, owner: Uuid) {
        *self.generations.entry(owner).or_insert(0) += 1;
        self.entries.remove(&owner);
    }
}

pub struct ListingCache {
    recipes: CachedView<RecipeSummary>,
    tags: CachedView<TagSummary>,
}

impl Default for ListingCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingCache {
    pub fn new() -> Self {
        Self {
            recipes: CachedView::new(),
            tags: CachedView::new(),
        }
    }

    pub async fn recipes(
        &self,
        owner: Uuid,
        catalog: &dyn RecipeCatalog,
    ) -> Result<Arc<Vec<RecipeSummary>>, StoreError> {
        if let Some(hit) = self.recipes.get(owner) {
            tracing::debug!(%owner, "Recipe listing cache hit");
            return Ok(hit);
        }

        let generation = self.recipes.generation(owner);
        let fresh = Arc::new(catalog.list_recipes(owner).await?);
        self.recipes.store(owner, generation, fresh.clone());
        Ok(fresh)
    }

    pub async fn tags(
        &self,
        owner: Uuid,
        catalog: &dyn RecipeCatalog,
    ) -> Result<Arc<Vec<TagSummary>>, StoreError> {
        if let Some(hit) = self.tags.get(owner) {
            tracing::debug!(%owner, "Tag listing cache hit");
            return Ok(hit);
        }

        let generation = self.tags.generation(owner);
        let fresh = Arc::new(catalog.list_tags(owner).await?);
        self.tags.store(owner, generation, fresh.clone());
        Ok(fresh)
    }

    pub fn evict(&self, owner: Uuid, views: &[ListingView]) {
        for view in views {
            match view {
                ListingView::Recipes => self.recipes.invalidate(owner),
                ListingView::Tags => self.tags.invalidate(owner),
            }
        }
    }
}

#[async_trait]
impl CacheInvalidator for ListingCache {
    async fn invalidate(&self, owner: Uuid, views: &[ListingView]) {
        tracing::debug!(%owner, ?views, "Invalidating listing cache");
        self.evict(owner, views);
    }
}
