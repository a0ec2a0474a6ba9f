//! Sliding-window admission of import tasks.
//!
//! `min(W, N)` workers share an atomic cursor over the batch. A worker claims
//! the next index as soon as its previous task finishes, so at most `W` tasks
//! run at once and a free slot is refilled immediately. The batch is done when
//! every worker has returned, which the scheduler observes by joining them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinSet;

use crate::types::{ImportResult, ImportTask};

/// Reported when a task's runner panicked.
pub const INTERNAL_TASK_ERROR: &str = "internal error while importing";

#[async_trait]
pub trait TaskRunner: Send + Sync + 'static {
    async fn run(&self, task: &ImportTask) -> ImportResult;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    Started { index: usize, url: String },
    Finished(ImportResult),
}

#[derive(Debug, Clone, Copy)]
pub struct TaskScheduler {
    concurrency: usize,
}

impl TaskScheduler {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every URL through `runner`, reporting each start and finish on
    /// `events`. Returns once all tasks have finished. Send failures are
    /// ignored: a dropped receiver does not stop the batch.
    pub async fn run(
        &self,
        runner: Arc<dyn TaskRunner>,
        urls: Vec<String>,
        events: UnboundedSender<SchedulerEvent>,
    ) {
        let urls: Arc<[String]> = urls.into();
        let cursor = Arc::new(AtomicUsize::new(0));
        let active = Arc::new(AtomicUsize::new(0));
        let workers = self.concurrency.min(urls.len());

        let mut set = JoinSet::new();
        for worker_id in 0..workers {
            set.spawn(worker(
                worker_id,
                runner.clone(),
                urls.clone(),
                cursor.clone(),
                active.clone(),
                events.clone(),
            ));
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Import worker exited abnormally");
            }
        }
    }
}

async fn worker(
    worker_id: usize,
    runner: Arc<dyn TaskRunner>,
    urls: Arc<[String]>,
    cursor: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
    events: UnboundedSender<SchedulerEvent>,
) {
    loop {
        let index = cursor.fetch_add(1, Ordering::SeqCst);
        let Some(url) = urls.get(index) else {
            break;
        };

        let mut task = ImportTask::new(index, url.clone());
        task.mark_running();
        let running = active.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(worker_id, index, running, "Task admitted");
        let _ = events.send(SchedulerEvent::Started {
            index,
            url: url.clone(),
        });

        // Run on its own task so a panic in the pipeline fails this task only.
        let handle = {
            let runner = runner.clone();
            let task = task.clone();
            tokio::spawn(async move { runner.run(&task).await })
        };
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(index, error = %e, "Import task panicked");
                ImportResult::failed(&task, INTERNAL_TASK_ERROR)
            }
        };

        task.mark_finished(&result);
        active.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!(worker_id, index, status = ?task.status, "Task finished");
        let _ = events.send(SchedulerEvent::Finished(result));
    }
}
