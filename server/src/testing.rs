//! In-memory backends for handler tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use larder_core::extract::{ExtractorSet, FakeExtractor};
use larder_core::generate::FakeGenerator;
use larder_core::platform::VideoPlatform;
use larder_core::store::MemoryStore;
use larder_core::{BatchImporter, ImporterConfig, StoreError};
use uuid::Uuid;

use crate::auth::{hash_token, AuthenticatedUser, SessionStore};
use crate::cache::ListingCache;
use crate::catalog::{RecipeCatalog, RecipeSummary, TagSummary};
use crate::state::AppState;

#[derive(Default)]
pub struct TestBackend {
    pub store: Arc<MemoryStore>,
    sessions: Mutex<HashMap<String, AuthenticatedUser>>,
}

impl TestBackend {
    /// Register a user and return a bearer token for it.
    pub fn login(&self, username: &str) -> (AuthenticatedUser, String) {
        let user = AuthenticatedUser {
            id: Uuid::new_v4(),
            username: username.to_string(),
        };
        let token = format!("token-{}", user.id);
        self.sessions
            .lock()
            .unwrap()
            .insert(hash_token(&token), user.clone());
        (user, token)
    }
}

#[async_trait]
impl SessionStore for TestBackend {
    async fn user_for_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<AuthenticatedUser>, StoreError> {
        Ok(self.sessions.lock().unwrap().get(token_hash).cloned())
    }
}

#[async_trait]
impl RecipeCatalog for TestBackend {
    async fn list_recipes(&self, owner: Uuid) -> Result<Vec<RecipeSummary>, StoreError> {
        Ok(self
            .store
            .recipes_for(owner)
            .into_iter()
            .rev()
            .map(|r| RecipeSummary {
                id: r.id,
                slug: r.slug,
                name: r.draft.name,
                category: r.draft.category,
                created_at: Utc::now(),
            })
            .collect())
    }

    async fn list_tags(&self, owner: Uuid) -> Result<Vec<TagSummary>, StoreError> {
        let used: Vec<Uuid> = self
            .store
            .recipes_for(owner)
            .into_iter()
            .flat_map(|r| r.tag_ids)
            .collect();
        let mut tags: Vec<TagSummary> = self
            .store
            .tags()
            .into_iter()
            .filter(|t| used.contains(&t.id))
            .map(|t| TagSummary {
                id: t.id,
                name: t.name,
                slug: t.slug,
            })
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }
}

pub fn default_extractors() -> ExtractorSet {
    ExtractorSet::new()
        .with(Arc::new(FakeExtractor::new(VideoPlatform::YouTube)))
        .with(Arc::new(FakeExtractor::new(VideoPlatform::TikTok)))
}

pub fn test_app(
    backend: Arc<TestBackend>,
    extractors: ExtractorSet,
    generator: FakeGenerator,
) -> Router {
    let listings = Arc::new(ListingCache::new());
    let importer = BatchImporter::new(
        extractors,
        Arc::new(generator),
        backend.store.clone(),
        listings.clone(),
        ImporterConfig::default(),
    );

    let state = AppState {
        importer,
        sessions: backend.clone(),
        catalog: backend,
        listings,
    };

    crate::api::router().with_state(state)
}
