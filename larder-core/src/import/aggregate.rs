use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ImportResult, ImportTask, TaskStatus};

/// Reported for a task whose result never arrived.
pub const LOST_TASK_ERROR: &str = "import task did not complete";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

/// Final outcome of a batch, both lists sorted by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub successful: Vec<ImportResult>,
    pub failed: Vec<ImportResult>,
    pub total_processed: usize,
}

/// Collects one result per task. Owned by a single consumer; not shared.
#[derive(Debug)]
pub struct ResultAggregator {
    tasks: Vec<ImportTask>,
    results: BTreeMap<usize, ImportResult>,
}

impl ResultAggregator {
    pub fn new(urls: &[String]) -> Self {
        Self {
            tasks: urls
                .iter()
                .enumerate()
                .map(|(index, url)| ImportTask::new(index, url.clone()))
                .collect(),
            results: BTreeMap::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.tasks.len()
    }

    pub fn mark_started(&mut self, index: usize) {
        if let Some(task) = self.tasks.get_mut(index) {
            task.mark_running();
        }
    }

    /// Record a result and return progress after it. A second result for the
    /// same index, or one outside the batch, is ignored.
    pub fn record(&mut self, result: ImportResult) -> Progress {
        match self.tasks.get_mut(result.index) {
            Some(task) if !self.results.contains_key(&result.index) => {
                task.mark_finished(&result);
                self.results.insert(result.index, result);
            }
            _ => {
                tracing::warn!(index = result.index, "Ignoring unexpected import result");
            }
        }
        self.progress()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            current: self.results.len(),
            total: self.tasks.len(),
        }
    }

    pub fn status(&self, index: usize) -> Option<TaskStatus> {
        self.tasks.get(index).map(|t| t.status)
    }

    /// Sort by index and partition. Tasks with no recorded result are
    /// reported as failed so the summary always covers the whole batch.
    pub fn finish(mut self) -> BatchSummary {
        for task in &self.tasks {
            if !self.results.contains_key(&task.index) {
                tracing::error!(index = task.index, url = %task.url, "No result recorded for task");
                self.results
                    .insert(task.index, ImportResult::failed(task, LOST_TASK_ERROR));
            }
        }

        let total_processed = self.results.len();
        let (successful, failed): (Vec<_>, Vec<_>) =
            self.results.into_values().partition(|r| r.success);

        BatchSummary {
            successful,
            failed,
            total_processed,
        }
    }
}
