//! Queue manager - three-phase crawl orchestration
//!
//! A run is three barrier-separated phases:
//! 1. Discovery: one list task per discoverable source
//! 2. Retrieval: one fetch task per surviving URL
//! 3. Processing: one batch task per data-processing source
//!
//! Every phase partitions its tasks round-robin over fresh workers, spawns
//! them, and awaits all of them before merging their reports into session
//! history. A failure inside one task never aborts the phase.

use crate::config::{resolve_worker_count, Config};
use crate::crawler::scheduler::{partition_round_robin, TaskKind, TaskPayload};
use crate::crawler::worker::{Worker, WorkerReport};
use crate::crawler::NetworkFetcher;
use crate::output::CrawlMetrics;
use crate::sources::{BatchReport, FetchOutcome, RunContext, SourceRegistry};
use crate::state::{SourceKind, SourceState};
use crate::storage::{open_history, HistoryStore};
use crate::url::UrlSet;
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Totals for a finished run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_date: NaiveDate,
    pub workers: usize,
    pub discovered: usize,
    pub fetched: usize,
    pub saved: usize,
    pub failed: usize,
    pub processed: Vec<(String, BatchReport)>,
    pub task_errors: usize,
    pub metrics: CrawlMetrics,
}

impl RunSummary {
    pub fn log(&self) {
        tracing::info!("=== Crawl Complete ===");
        tracing::info!("Run date: {}", self.run_date);
        tracing::info!("URLs queued for retrieval: {}", self.discovered);
        tracing::info!(
            "Articles fetched: {} (saved {}, failed {})",
            self.fetched,
            self.saved,
            self.failed
        );
        for (source, batch) in &self.processed {
            tracing::info!(
                "{}: examined {}, removed {}",
                source,
                batch.examined,
                batch.removed
            );
        }
        if self.task_errors > 0 {
            tracing::warn!("{} task(s) ended in error", self.task_errors);
        }
    }
}

/// Orchestrates the crawl phases over a fixed number of workers
pub struct QueueManager {
    workers: usize,
    registry: Arc<SourceRegistry>,
    history: Arc<dyn HistoryStore>,
    context: Arc<RunContext>,
    frontier: BTreeMap<String, Vec<String>>,
    metrics: CrawlMetrics,
}

impl QueueManager {
    /// Validates the worker count, opens session history and loads every source
    ///
    /// # Errors
    ///
    /// * `ConfigError::WorkerCount` - More workers than the core heuristic allows
    /// * `HistoryError::UncleanShutdown` - A previous writer left a journal behind
    /// * `ConfigError::UnknownPlugin` and friends - A source could not be loaded
    pub fn configure(config: &Config, run_date: NaiveDate) -> crate::Result<Self> {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let workers = resolve_worker_count(config.crawler.workers, cores)?;
        tracing::info!("Using {} workers on {} cores", workers, cores);

        let history = Arc::new(open_history(Path::new(&config.history.database_path))?);
        Self::with_history(config, run_date, workers, history)
    }

    /// Builds a manager around an already opened history store
    pub fn with_history(
        config: &Config,
        run_date: NaiveDate,
        workers: usize,
        history: Arc<dyn HistoryStore>,
    ) -> crate::Result<Self> {
        let fetcher = Arc::new(NetworkFetcher::new(&config.network)?);
        let registry = Arc::new(SourceRegistry::from_config(config, fetcher)?);

        let context = Arc::new(RunContext {
            run_date,
            history: history.clone(),
            data_dir: PathBuf::from(&config.output.data_dir),
            min_page_bytes: config.crawler.min_page_bytes,
        });

        Ok(Self {
            workers: workers.max(1),
            registry,
            history,
            context,
            frontier: BTreeMap::new(),
            metrics: CrawlMetrics::new(),
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// URLs queued for retrieval, per source
    pub fn frontier(&self) -> &BTreeMap<String, Vec<String>> {
        &self.frontier
    }

    pub fn metrics(&self) -> &CrawlMetrics {
        &self.metrics
    }

    /// Runs all three phases in order
    pub async fn run(&mut self) -> RunSummary {
        tracing::info!(
            "Starting crawl for {} with {} sources",
            self.context.run_date,
            self.registry.len()
        );

        let discovered = self.run_discovery_phase().await;
        let outcomes = self.run_retrieval_phase().await;
        let processed = self.run_processing_phase().await;

        self.metrics.log_summary("run");

        let saved = outcomes.iter().filter(|o| o.success()).count();
        RunSummary {
            run_date: self.context.run_date,
            workers: self.workers,
            discovered,
            fetched: outcomes.len(),
            saved,
            failed: outcomes.len() - saved,
            processed,
            task_errors: self.metrics.task_errors,
            metrics: self.metrics.clone(),
        }
    }

    /// Lists candidate URLs for every discoverable source
    ///
    /// Aggregator URLs are handed to the content source owning their domain.
    /// Each source's list is then deduplicated against session history and
    /// against the URLs already claimed by earlier sources.
    ///
    /// # Returns
    ///
    /// The number of URLs queued for retrieval
    pub async fn run_discovery_phase(&mut self) -> usize {
        let tasks: Vec<(String, TaskPayload)> = self
            .registry
            .iter()
            .filter(|source| source.kind().is_discoverable())
            .map(|source| (source.name().to_string(), TaskPayload::ListFetch))
            .collect();

        tracing::info!("Discovery phase: {} sources", tasks.len());
        let mut discovered = BTreeMap::new();
        for report in self.run_phase(TaskKind::Discover, tasks).await {
            discovered.extend(report.discovered);
        }

        self.merge_discovered(discovered)
    }

    fn merge_discovered(&mut self, mut discovered: BTreeMap<String, Vec<String>>) -> usize {
        let mut own: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut routed: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut unrouted = 0;

        for source in self.registry.iter() {
            let Some(urls) = discovered.remove(source.name()) else {
                continue;
            };

            if source.kind() == SourceKind::Aggregator {
                for url in urls {
                    match self.registry.route(&url) {
                        Some(owner) => routed
                            .entry(owner.name().to_string())
                            .or_default()
                            .push(url),
                        None => unrouted += 1,
                    }
                }
            } else {
                own.insert(source.name().to_string(), urls);
            }
        }
        if unrouted > 0 {
            tracing::info!("Dropped {} aggregated URLs with no owning source", unrouted);
        }

        let mut claimed = UrlSet::new();
        let mut frontier = BTreeMap::new();

        for source in self.registry.iter() {
            let name = source.name();
            if !source.kind().fetches_content() {
                continue;
            }

            let mut candidates = own.remove(name).unwrap_or_default();
            candidates.extend(routed.remove(name).unwrap_or_default());

            let candidates = match self.history.remove_already_fetched(&candidates, name) {
                Ok(urls) => urls,
                Err(e) => {
                    tracing::warn!(source = name, "History filtering failed: {}", e);
                    candidates
                }
            };

            let kept: Vec<String> = candidates
                .into_iter()
                .filter(|url| claimed.insert(url.as_str()))
                .collect();

            if let Err(e) = self.history.add_pending(&kept, name) {
                tracing::warn!(source = name, "Could not record pending URLs: {}", e);
            }

            self.metrics.record_discovered(name, kept.len());
            if !kept.is_empty() {
                frontier.insert(name.to_string(), kept);
            }
        }

        for source in self.registry.iter() {
            let next = match source.kind() {
                SourceKind::Aggregator => SourceState::Stopped,
                kind if kind.fetches_content() => SourceState::FetchingContent,
                _ => continue,
            };
            if let Err(e) = source.descriptor.transition(next) {
                tracing::warn!("{}", e);
            }
        }

        let total = frontier.values().map(Vec::len).sum();
        tracing::info!(
            "Discovery complete: {} URLs across {} sources",
            total,
            frontier.len()
        );
        self.frontier = frontier;
        total
    }

    /// Fetches every URL in the frontier and records the outcomes
    ///
    /// Saved articles are recorded as completed in one batch; every other
    /// outcome is recorded as failed.
    pub async fn run_retrieval_phase(&mut self) -> Vec<FetchOutcome> {
        let frontier = std::mem::take(&mut self.frontier);
        let mut tasks = Vec::new();

        for (source, urls) in frontier {
            if let Err(e) = self.history.mark_attempted(&urls) {
                tracing::warn!(source = source.as_str(), "Could not mark attempts: {}", e);
            }
            for url in urls {
                tasks.push((source.clone(), TaskPayload::ContentFetch(url)));
            }
        }

        tracing::info!("Retrieval phase: {} URLs", tasks.len());
        let outcomes: Vec<FetchOutcome> = self
            .run_phase(TaskKind::Fetch, tasks)
            .await
            .into_iter()
            .flat_map(|report| report.outcomes)
            .collect();

        let (completed, failed): (Vec<FetchOutcome>, Vec<FetchOutcome>) =
            outcomes.iter().cloned().partition(|o| o.success());

        match self.history.record_completed(&completed) {
            Ok(count) => tracing::info!("Recorded {} completed URLs", count),
            Err(e) => tracing::error!("Could not record completed URLs: {}", e),
        }

        let now = Utc::now();
        for outcome in &failed {
            if let Err(e) = self.history.record_failure(outcome, &outcome.source, now) {
                tracing::error!(
                    source = outcome.source.as_str(),
                    "Could not record failure of {}: {}",
                    outcome.url,
                    e
                );
            }
        }

        for outcome in &outcomes {
            self.metrics.record_outcome(outcome);
        }

        for source in self.registry.iter() {
            if source.descriptor.state() == SourceState::FetchingContent {
                if let Err(e) = source.descriptor.transition(SourceState::Stopped) {
                    tracing::warn!("{}", e);
                }
            }
        }

        tracing::info!(
            "Retrieval complete: {} saved, {} failed",
            completed.len(),
            failed.len()
        );
        outcomes
    }

    /// Runs the batch entry point of every data-processing source
    pub async fn run_processing_phase(&mut self) -> Vec<(String, BatchReport)> {
        let tasks: Vec<(String, TaskPayload)> = self
            .registry
            .iter()
            .filter(|source| source.kind().is_processor())
            .map(|source| (source.name().to_string(), TaskPayload::ProcessData))
            .collect();

        tracing::info!("Processing phase: {} sources", tasks.len());
        self.run_phase(TaskKind::Process, tasks)
            .await
            .into_iter()
            .flat_map(|report| report.processed)
            .collect()
    }

    /// Partitions tasks over fresh workers and waits for all of them
    async fn run_phase(
        &mut self,
        kind: TaskKind,
        tasks: Vec<(String, TaskPayload)>,
    ) -> Vec<WorkerReport> {
        if tasks.is_empty() {
            return Vec::new();
        }

        let mut handles = Vec::new();
        for (id, queue) in partition_round_robin(tasks, self.workers)
            .into_iter()
            .enumerate()
        {
            if queue.is_empty() {
                continue;
            }
            let worker = Worker::new(
                id,
                kind,
                queue,
                self.registry.clone(),
                self.context.clone(),
            );
            handles.push(tokio::spawn(worker.run()));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(report) => {
                    self.metrics.task_errors += report.errors;
                    reports.push(report);
                }
                Err(e) => {
                    tracing::error!("A {} worker did not finish: {}", kind, e);
                }
            }
        }

        reports
    }
}
