//! Runs one URL through extraction, generation and persistence.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{ExtractError, GenerateError};
use crate::extract::ExtractorSet;
use crate::generate::{GenerationRequest, RecipeGenerator};
use crate::persist::{PersistError, RecipePersister};
use crate::platform::classify;
use crate::types::{ImportResult, ImportTask};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Extraction,
    Generation,
    Persistence,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Extraction => write!(f, "extraction"),
            Stage::Generation => write!(f, "generation"),
            Stage::Persistence => write!(f, "persistence"),
        }
    }
}

/// Why a task failed. Rendered into [`ImportResult::error`].
#[derive(Debug, Error)]
pub enum TaskFailure {
    #[error("unsupported URL")]
    UnsupportedUrl,

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    Persist(#[from] PersistError),

    #[error("{stage} timed out after {secs}s")]
    TimedOut { stage: Stage, secs: u64 },
}

#[derive(Clone)]
pub struct ImportPipeline {
    extractors: ExtractorSet,
    generator: Arc<dyn RecipeGenerator>,
    persister: RecipePersister,
    stage_timeout: Duration,
}

impl ImportPipeline {
    pub fn new(
        extractors: ExtractorSet,
        generator: Arc<dyn RecipeGenerator>,
        persister: RecipePersister,
        stage_timeout: Duration,
    ) -> Self {
        Self {
            extractors,
            generator,
            persister,
            stage_timeout,
        }
    }

    /// Produce the task's single result. Never fails: every error becomes a
    /// failed [`ImportResult`].
    pub async fn run(&self, owner: Uuid, task: &ImportTask) -> ImportResult {
        let span = tracing::info_span!("import_task", index = task.index, url = %task.url);

        match self.execute(owner, task).instrument(span.clone()).await {
            Ok(recipe_name) => {
                span.in_scope(|| tracing::info!(recipe = %recipe_name, "Imported recipe"));
                ImportResult::succeeded(task, recipe_name)
            }
            Err(failure) => {
                span.in_scope(|| tracing::warn!(error = %failure, "Import failed"));
                ImportResult::failed(task, failure.to_string())
            }
        }
    }

    async fn execute(&self, owner: Uuid, task: &ImportTask) -> Result<String, TaskFailure> {
        let source = classify(&task.url).ok_or(TaskFailure::UnsupportedUrl)?;
        let extractor = self.extractors.get(source.platform)?;

        let content = self
            .timed(Stage::Extraction, extractor.extract(&source))
            .await?;

        let thumbnail_url = content
            .thumbnail_url
            .clone()
            .or_else(|| source.thumbnail_url());

        let request = GenerationRequest {
            title: content.title,
            description: content.description,
            transcript: content.transcript,
            thumbnail_url: thumbnail_url.clone(),
            video_url: task.url.clone(),
            author: content.author,
            platform: source.platform,
        };

        let mut draft = self
            .timed(Stage::Generation, self.generator.generate(&request))
            .await?;
        if draft.name.trim().is_empty() {
            return Err(GenerateError::MissingRecipe.into());
        }

        if draft.video_url.is_none() {
            draft.video_url = Some(task.url.clone());
        }
        if draft.source_url.is_none() {
            draft.source_url = Some(task.url.clone());
        }
        if draft.image_url.is_none() {
            draft.image_url = thumbnail_url;
        }

        // Not timed: an abandoned write could still land after being reported as failed.
        self.persister
            .persist(owner, &draft)
            .instrument(tracing::debug_span!("pipeline_stage", stage = %Stage::Persistence))
            .await?;

        Ok(draft.name)
    }

    async fn timed<T, E, F>(&self, stage: Stage, fut: F) -> Result<T, TaskFailure>
    where
        F: Future<Output = Result<T, E>>,
        TaskFailure: From<E>,
    {
        let span = tracing::debug_span!("pipeline_stage", stage = %stage);
        match tokio::time::timeout(self.stage_timeout, fut.instrument(span)).await {
            Ok(result) => result.map_err(TaskFailure::from),
            Err(_) => Err(TaskFailure::TimedOut {
                stage,
                secs: self.stage_timeout.as_secs(),
            }),
        }
    }
}

impl fmt::Debug for ImportPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportPipeline")
            .field("extractors", &self.extractors)
            .field("generator", &self.generator.generator_name())
            .field("stage_timeout", &self.stage_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FakeExtractor;
    use crate::generate::FakeGenerator;
    use crate::platform::VideoPlatform;
    use crate::store::MemoryStore;
    use crate::types::ExtractedContent;

    fn pipeline(
        extractors: ExtractorSet,
        generator: FakeGenerator,
        store: Arc<MemoryStore>,
    ) -> ImportPipeline {
        ImportPipeline::new(
            extractors,
            Arc::new(generator),
            RecipePersister::new(store),
            Duration::from_secs(120),
        )
    }

    fn both_platforms() -> ExtractorSet {
        ExtractorSet::new()
            .with(Arc::new(FakeExtractor::new(VideoPlatform::YouTube)))
            .with(Arc::new(FakeExtractor::new(VideoPlatform::TikTok)))
    }

    #[tokio::test]
    async fn unsupported_url_fails_without_calling_collaborators() {
        let store = Arc::new(MemoryStore::new());
        let generator = Arc::new(FakeGenerator::new());
        let pipeline = ImportPipeline::new(
            both_platforms(),
            generator.clone(),
            RecipePersister::new(store.clone()),
            Duration::from_secs(120),
        );

        let result = pipeline
            .run(Uuid::new_v4(), &ImportTask::new(4, "https://vimeo.com/123"))
            .await;

        assert!(!result.success);
        assert_eq!(result.index, 4);
        assert_eq!(result.error.as_deref(), Some("unsupported URL"));
        assert_eq!(generator.call_count(), 0);
        assert!(store.recipes().is_empty());
    }

    #[tokio::test]
    async fn successful_import_fills_media_urls() {
        let store = Arc::new(MemoryStore::new());
        let extractors = ExtractorSet::new().with(Arc::new(
            FakeExtractor::new(VideoPlatform::YouTube).with_content(
                "AAA",
                ExtractedContent {
                    title: "Miso Soup".to_string(),
                    description: "Quick miso".to_string(),
                    ..Default::default()
                },
            ),
        ));
        let pipeline = pipeline(extractors, FakeGenerator::new(), store.clone());

        let result = pipeline
            .run(Uuid::new_v4(), &ImportTask::new(0, "https://youtu.be/AAA"))
            .await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.recipe_name.as_deref(), Some("Miso Soup"));

        let saved = store.recipes();
        assert_eq!(saved.len(), 1);
        let draft = &saved[0].draft;
        assert_eq!(draft.video_url.as_deref(), Some("https://youtu.be/AAA"));
        assert_eq!(draft.source_url.as_deref(), Some("https://youtu.be/AAA"));
        assert_eq!(
            draft.image_url.as_deref(),
            Some("https://img.youtube.com/vi/AAA/hqdefault.jpg")
        );
    }

    #[tokio::test]
    async fn extractor_failure_message_is_reported() {
        let store = Arc::new(MemoryStore::new());
        let extractors = ExtractorSet::new().with(Arc::new(
            FakeExtractor::new(VideoPlatform::TikTok)
                .with_failure("https://www.tiktok.com/@u/video/BBB", Some("Video unavailable")),
        ));
        let pipeline = pipeline(extractors, FakeGenerator::new(), store.clone());

        let result = pipeline
            .run(
                Uuid::new_v4(),
                &ImportTask::new(1, "https://www.tiktok.com/@u/video/BBB"),
            )
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Video unavailable"));
        assert!(store.recipes().is_empty());
    }

    #[tokio::test]
    async fn missing_extractor_is_a_task_failure() {
        let store = Arc::new(MemoryStore::new());
        let extractors =
            ExtractorSet::new().with(Arc::new(FakeExtractor::new(VideoPlatform::YouTube)));
        let pipeline = pipeline(extractors, FakeGenerator::new(), store);

        let result = pipeline
            .run(
                Uuid::new_v4(),
                &ImportTask::new(0, "https://www.tiktok.com/@u/video/1"),
            )
            .await;

        assert_eq!(
            result.error.as_deref(),
            Some("No extractor configured for TikTok")
        );
    }

    #[tokio::test]
    async fn generator_without_recipe_fails() {
        let store = Arc::new(MemoryStore::new());
        let generator = FakeGenerator::new().fail_for("Recipe from AAA", None);
        let pipeline = pipeline(both_platforms(), generator, store.clone());

        let result = pipeline
            .run(Uuid::new_v4(), &ImportTask::new(0, "https://youtu.be/AAA"))
            .await;

        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("Generation response did not include a recipe")
        );
        assert!(store.recipes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_extraction_times_out() {
        let store = Arc::new(MemoryStore::new());
        let extractors = ExtractorSet::new().with(Arc::new(
            FakeExtractor::new(VideoPlatform::YouTube).with_latency(Duration::from_secs(600)),
        ));
        let pipeline = ImportPipeline::new(
            extractors,
            Arc::new(FakeGenerator::new()),
            RecipePersister::new(store.clone()),
            Duration::from_secs(5),
        );

        let result = pipeline
            .run(Uuid::new_v4(), &ImportTask::new(0, "https://youtu.be/AAA"))
            .await;

        assert_eq!(
            result.error.as_deref(),
            Some("extraction timed out after 5s")
        );
        assert!(store.recipes().is_empty());
    }
}
