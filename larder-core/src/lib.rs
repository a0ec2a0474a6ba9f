//! Core of the Larder batch importer: turns cooking-video URLs into saved
//! recipes through extraction, generation and persistence, several at a time.
//!
//! The server crate wires these pieces to HTTP and PostgreSQL; everything here
//! is storage-agnostic and testable against the in-memory fakes.

pub mod error;
pub mod extract;
pub mod generate;
pub mod import;
pub mod llm;
pub mod persist;
pub mod platform;
pub mod slug;
pub mod store;
pub mod types;

pub use error::{BatchError, ExtractError, GenerateError};
pub use import::{
    BatchImporter, BatchSummary, CacheInvalidator, ImportEvent, ImporterConfig, ListingView,
    NoopInvalidator, Progress, StartError,
};
pub use persist::{PersistError, RecipePersister};
pub use store::{NewRecipe, RecipeStore, StoreError};
pub use types::{
    DraftIngredient, DraftIngredients, ExtractedContent, ImportBatch, ImportResult, ImportTask,
    IngredientGroup, PersistedRecipe, RecipeDraft, TagRef, TaskStatus, MAX_BATCH_SIZE,
};
