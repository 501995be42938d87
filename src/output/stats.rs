//! Crawl metrics and session history statistics
//!
//! This module provides the per-run counters the queue manager keeps while
//! phases execute, and the `--stats` report built from the session history.

use crate::sources::{FetchOutcome, FetchStatus};
use crate::storage::HistoryStatistics;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Counters for one source during a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMetrics {
    /// URLs handed to the retrieval phase
    pub discovered: usize,
    /// Fetch outcomes received
    pub fetched: usize,
    pub saved: usize,
    pub failed: usize,
    pub raw_bytes: usize,
    pub text_bytes: usize,
    /// Failures broken down by status
    pub failures: BTreeMap<String, usize>,
}

/// Counters for a whole run, keyed by source name
#[derive(Debug, Clone, Default)]
pub struct CrawlMetrics {
    pub per_source: BTreeMap<String, SourceMetrics>,
    /// Tasks that returned an error instead of a result
    pub task_errors: usize,
}

impl CrawlMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_discovered(&mut self, source: &str, count: usize) {
        self.source_mut(source).discovered += count;
    }

    pub fn record_outcome(&mut self, outcome: &FetchOutcome) {
        let metrics = self.source_mut(&outcome.source);
        metrics.fetched += 1;
        metrics.raw_bytes += outcome.raw_size;

        if outcome.status == FetchStatus::Saved {
            metrics.saved += 1;
            metrics.text_bytes += outcome.text_size;
        } else {
            metrics.failed += 1;
            *metrics
                .failures
                .entry(outcome.status.as_str().to_string())
                .or_insert(0) += 1;
        }
    }

    pub fn total_discovered(&self) -> usize {
        self.per_source.values().map(|m| m.discovered).sum()
    }

    pub fn total_saved(&self) -> usize {
        self.per_source.values().map(|m| m.saved).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.per_source.values().map(|m| m.failed).sum()
    }

    /// Logs one line per source at info level
    pub fn log_summary(&self, phase: &str) {
        for (source, m) in &self.per_source {
            tracing::info!(
                phase,
                source = source.as_str(),
                discovered = m.discovered,
                saved = m.saved,
                failed = m.failed,
                raw_bytes = m.raw_bytes,
                "Source metrics"
            );
        }
        if self.task_errors > 0 {
            tracing::warn!(phase, "{} task(s) ended in error", self.task_errors);
        }
    }

    fn source_mut(&mut self, source: &str) -> &mut SourceMetrics {
        self.per_source.entry(source.to_string()).or_default()
    }
}

/// Renders session history statistics as a plain-text report
pub fn format_statistics(stats: &HistoryStatistics) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Session History ===\n");
    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Completed: {}", stats.completed);
    let _ = writeln!(out, "  Pending: {}", stats.pending);
    let _ = writeln!(out, "  Failed: {}", stats.failed);
    let _ = writeln!(out, "  Deleted duplicates: {}", stats.duplicates);

    let attempted = stats.completed + stats.failed;
    let success_rate = if attempted > 0 {
        (stats.completed as f64 / attempted as f64) * 100.0
    } else {
        0.0
    };
    let _ = writeln!(
        out,
        "  Success rate: {:.1}% ({} / {} attempted URLs)",
        success_rate, stats.completed, attempted
    );

    if !stats.per_source.is_empty() {
        let _ = writeln!(out, "\nBy Source:");
        let _ = writeln!(
            out,
            "  {:<24} {:>10} {:>10} {:>10} {:>10}",
            "source", "completed", "pending", "failed", "dupes"
        );
        for (source, counts) in &stats.per_source {
            let _ = writeln!(
                out,
                "  {:<24} {:>10} {:>10} {:>10} {:>10}",
                source, counts.completed, counts.pending, counts.failed, counts.duplicates
            );
        }
    }

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HistoryStatistics) {
    print!("{}", format_statistics(stats));
}
