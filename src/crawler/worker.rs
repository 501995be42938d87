//! Phase worker
//!
//! A worker owns one private task queue for one phase and drains it in
//! priority order, dispatching each task to the source it names. A failed
//! dispatch is logged and counted; the loop always moves on.

use crate::crawler::scheduler::{Task, TaskKind, TaskPayload, TaskQueue};
use crate::sources::{BatchReport, FetchOutcome, RunContext, SourceRegistry};
use crate::state::SourceState;
use crate::GleanError;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Everything a worker produced during one phase
#[derive(Debug, Default)]
pub struct WorkerReport {
    pub worker: usize,
    /// Candidate URLs per source (discovery)
    pub discovered: BTreeMap<String, Vec<String>>,
    /// Fetch outcomes in completion order (retrieval)
    pub outcomes: Vec<FetchOutcome>,
    /// Batch results per source (processing)
    pub processed: Vec<(String, BatchReport)>,
    /// Tasks that could not be dispatched or returned an error
    pub errors: usize,
}

pub struct Worker {
    id: usize,
    kind: TaskKind,
    queue: TaskQueue,
    registry: Arc<SourceRegistry>,
    context: Arc<RunContext>,
}

impl Worker {
    pub fn new(
        id: usize,
        kind: TaskKind,
        queue: TaskQueue,
        registry: Arc<SourceRegistry>,
        context: Arc<RunContext>,
    ) -> Self {
        Self {
            id,
            kind,
            queue,
            registry,
            context,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Number of tasks still queued
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Drains the queue and returns what the tasks produced
    pub async fn run(mut self) -> WorkerReport {
        let mut report = WorkerReport {
            worker: self.id,
            ..WorkerReport::default()
        };

        tracing::debug!(
            worker = self.id,
            "Starting {} worker with {} tasks",
            self.kind,
            self.queue.len()
        );

        while let Some(task) = self.queue.pop() {
            let source = task.source.clone();
            if let Err(e) = self.dispatch(task, &mut report).await {
                tracing::error!(worker = self.id, source = source.as_str(), "Task failed: {}", e);
                report.errors += 1;
            }
        }

        tracing::debug!(worker = self.id, "{} worker finished", self.kind);
        report
    }

    async fn dispatch(&self, task: Task, report: &mut WorkerReport) -> crate::Result<()> {
        if task.payload.kind() != self.kind {
            return Err(GleanError::TaskMismatch {
                source_name: task.source,
                worker_kind: self.kind,
            });
        }

        let source = self
            .registry
            .get(&task.source)
            .ok_or_else(|| GleanError::UnknownSource(task.source.clone()))?;

        match task.payload {
            TaskPayload::ListFetch => {
                source.descriptor.transition(SourceState::DiscoveringUrls)?;
                let urls = source.engine.discover_urls(&self.context).await;
                report.discovered.insert(task.source, urls);
            }
            TaskPayload::ContentFetch(url) => {
                source.descriptor.transition(SourceState::FetchingContent)?;
                let outcome = source.engine.fetch_and_extract(&url, &self.context).await;
                tracing::debug!(
                    worker = self.id,
                    source = task.source.as_str(),
                    "{} -> {}",
                    url,
                    outcome.status
                );
                report.outcomes.push(outcome);
            }
            TaskPayload::ProcessData => {
                source.descriptor.transition(SourceState::ProcessingData)?;
                let result = source.engine.process_batch(&self.context).await;
                source.descriptor.transition(SourceState::Stopped)?;
                report.processed.push((task.source, result?));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NetworkConfig, SourceConfig};
    use crate::crawler::scheduler::partition_round_robin;
    use crate::crawler::NetworkFetcher;
    use crate::sources::{DuplicateSweeper, SourceProfile};
    use crate::state::SourceKind;
    use crate::storage::open_history;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn setup(dir: &TempDir) -> (Arc<SourceRegistry>, Arc<RunContext>) {
        let fetcher = Arc::new(NetworkFetcher::new(&NetworkConfig::default()).unwrap());
        let profile = SourceProfile::from_config(
            &SourceConfig {
                name: "dedupe".to_string(),
                kind: SourceKind::DataProcessor,
                plugin: "duplicate-sweeper".to_string(),
                ..SourceConfig::default()
            },
            1,
        )
        .unwrap();

        let mut registry = SourceRegistry::new();
        registry
            .register(Arc::new(DuplicateSweeper::new(profile)), fetcher)
            .unwrap();

        let context = RunContext {
            run_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            history: Arc::new(open_history(&dir.path().join("history.db")).unwrap()),
            data_dir: dir.path().join("data"),
            min_page_bytes: 0,
        };
        (Arc::new(registry), Arc::new(context))
    }

    #[tokio::test]
    async fn test_errors_do_not_stop_the_loop() {
        let dir = TempDir::new().unwrap();
        let (registry, context) = setup(&dir);

        let tasks = vec![
            ("ghost".to_string(), TaskPayload::ProcessData),
            ("dedupe".to_string(), TaskPayload::ListFetch),
            ("dedupe".to_string(), TaskPayload::ProcessData),
        ];
        let queue = partition_round_robin(tasks, 1).remove(0);
        let worker = Worker::new(0, TaskKind::Process, queue, registry.clone(), context);
        assert_eq!(worker.pending(), 3);

        let report = worker.run().await;
        assert_eq!(report.errors, 2);
        assert_eq!(report.processed.len(), 1);
        assert_eq!(report.processed[0].0, "dedupe");
        assert_eq!(
            registry.get("dedupe").unwrap().descriptor.state(),
            SourceState::Stopped
        );
    }
}
