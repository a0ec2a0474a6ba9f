//! Batch import: schedules one pipeline per URL, streams progress events and
//! reports a sorted summary when every task has finished.

mod aggregate;
mod pipeline;
mod scheduler;

pub use aggregate::{BatchSummary, Progress, ResultAggregator, LOST_TASK_ERROR};
pub use pipeline::{ImportPipeline, Stage, TaskFailure};
pub use scheduler::{SchedulerEvent, TaskRunner, TaskScheduler, INTERNAL_TASK_ERROR};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

use crate::extract::ExtractorSet;
use crate::generate::RecipeGenerator;
use crate::persist::{RecipePersister, SLUG_RETRY_BACKOFF};
use crate::store::RecipeStore;
use crate::types::{ImportBatch, ImportResult, ImportTask};

/// Sent on the stream if the batch itself dies unexpectedly.
pub const BATCH_FAILED_ERROR: &str = "batch import failed unexpectedly";

/// One progress-stream event. Serialized with a `type` discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ImportEvent {
    Start { url: String, index: usize },
    Progress { result: ImportResult, progress: Progress },
    Complete(BatchSummary),
    Error { error: String },
}

impl ImportEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            ImportEvent::Start { .. } => "start",
            ImportEvent::Progress { .. } => "progress",
            ImportEvent::Complete(_) => "complete",
            ImportEvent::Error { .. } => "error",
        }
    }
}

/// Cached listing views that an import can make stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingView {
    Recipes,
    Tags,
}

#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, owner: Uuid, views: &[ListingView]);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

#[async_trait]
impl CacheInvalidator for NoopInvalidator {
    async fn invalidate(&self, _owner: Uuid, _views: &[ListingView]) {}
}

#[derive(Debug, Clone)]
pub struct ImporterConfig {
    /// Maximum pipelines running at once for one batch.
    pub concurrency: usize,
    /// Upper bound on each collaborator call.
    pub stage_timeout: Duration,
    pub slug_retry_backoff: Duration,
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            stage_timeout: Duration::from_secs(120),
            slug_retry_backoff: SLUG_RETRY_BACKOFF,
        }
    }
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error("no async runtime available: {0}")]
    NoRuntime(String),
}

#[derive(Clone)]
pub struct BatchImporter {
    pipeline: Arc<ImportPipeline>,
    scheduler: TaskScheduler,
    invalidator: Arc<dyn CacheInvalidator>,
}

impl BatchImporter {
    pub fn new(
        extractors: ExtractorSet,
        generator: Arc<dyn RecipeGenerator>,
        store: Arc<dyn RecipeStore>,
        invalidator: Arc<dyn CacheInvalidator>,
        config: ImporterConfig,
    ) -> Self {
        let persister = RecipePersister::new(store).with_backoff(config.slug_retry_backoff);
        let pipeline = ImportPipeline::new(extractors, generator, persister, config.stage_timeout);

        Self {
            pipeline: Arc::new(pipeline),
            scheduler: TaskScheduler::new(config.concurrency),
            invalidator,
        }
    }

    /// Start `batch` in the background and return its event stream.
    ///
    /// The batch runs to completion even if the receiver is dropped.
    pub fn start(
        &self,
        owner: Uuid,
        batch: ImportBatch,
    ) -> Result<UnboundedReceiver<ImportEvent>, StartError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|e| StartError::NoRuntime(e.to_string()))?;
        let (tx, rx) = mpsc::unbounded_channel();

        let importer = self.clone();
        let error_tx = tx.clone();
        runtime.spawn(async move {
            let job = tokio::spawn(async move { importer.run(owner, batch, tx).await });
            if let Err(e) = job.await {
                tracing::error!(%owner, error = %e, "Batch import aborted");
                let _ = error_tx.send(ImportEvent::Error {
                    error: BATCH_FAILED_ERROR.to_string(),
                });
            }
        });

        Ok(rx)
    }

    /// Run `batch` to completion, sending events to `events` as they happen.
    pub async fn run(
        &self,
        owner: Uuid,
        batch: ImportBatch,
        events: UnboundedSender<ImportEvent>,
    ) -> BatchSummary {
        let urls = batch.into_urls();
        let mut aggregator = ResultAggregator::new(&urls);
        tracing::info!(
            %owner,
            total = aggregator.total(),
            concurrency = self.scheduler.concurrency(),
            "Starting batch import"
        );
        let mut sink = EventSink::new(events);
        let (scheduler_tx, mut scheduler_rx) = mpsc::unbounded_channel();
        let runner: Arc<dyn TaskRunner> = Arc::new(OwnedPipeline {
            pipeline: self.pipeline.clone(),
            owner,
        });

        let schedule = self.scheduler.run(runner, urls, scheduler_tx);
        let consume = async {
            while let Some(event) = scheduler_rx.recv().await {
                match event {
                    SchedulerEvent::Started { index, url } => {
                        aggregator.mark_started(index);
                        sink.send(ImportEvent::Start { url, index });
                    }
                    SchedulerEvent::Finished(result) => {
                        let progress = aggregator.record(result.clone());
                        sink.send(ImportEvent::Progress { result, progress });
                    }
                }
            }
        };
        tokio::join!(schedule, consume);

        let summary = aggregator.finish();
        if !summary.successful.is_empty() {
            self.invalidator
                .invalidate(owner, &[ListingView::Recipes, ListingView::Tags])
                .await;
        }

        tracing::info!(
            %owner,
            successful = summary.successful.len(),
            failed = summary.failed.len(),
            "Batch import complete"
        );
        sink.send(ImportEvent::Complete(summary.clone()));
        summary
    }
}

impl std::fmt::Debug for BatchImporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchImporter")
            .field("pipeline", &self.pipeline)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

struct OwnedPipeline {
    pipeline: Arc<ImportPipeline>,
    owner: Uuid,
}

#[async_trait]
impl TaskRunner for OwnedPipeline {
    async fn run(&self, task: &ImportTask) -> ImportResult {
        self.pipeline.run(self.owner, task).await
    }
}

/// Forwards events to the caller, noting once if the caller has gone away.
struct EventSink {
    tx: UnboundedSender<ImportEvent>,
    disconnected: bool,
}

impl EventSink {
    fn new(tx: UnboundedSender<ImportEvent>) -> Self {
        Self {
            tx,
            disconnected: false,
        }
    }

    fn send(&mut self, event: ImportEvent) {
        if self.tx.send(event).is_err() && !self.disconnected {
            self.disconnected = true;
            tracing::info!("Import stream receiver dropped; continuing without progress events");
        }
    }
}
