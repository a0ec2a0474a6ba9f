use std::sync::Arc;

use axum::extract::FromRef;
use larder_core::BatchImporter;

use crate::auth::SessionStore;
use crate::cache::ListingCache;
use crate::catalog::RecipeCatalog;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub importer: BatchImporter,
    pub sessions: Arc<dyn SessionStore>,
    pub catalog: Arc<dyn RecipeCatalog>,
    pub listings: Arc<ListingCache>,
}

impl FromRef<AppState> for BatchImporter {
    fn from_ref(state: &AppState) -> Self {
        state.importer.clone()
    }
}
