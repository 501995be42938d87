//! Session history trait and error types
//!
//! This module defines the interface the crawl engine and queue manager use
//! to record the progress of every URL, and the errors it can produce.

use crate::sources::FetchOutcome;
use crate::storage::{HistoryStatistics, HistoryTable};
use chrono::{DateTime, FixedOffset, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during session history operations
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unclean shutdown detected: leftover journal file {}", path.display())]
    UncleanShutdown { path: PathBuf },
}

/// Result type for session history operations
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Durable record of completed, pending and failed URLs
///
/// Implementations serialize every operation behind a single guard, so one
/// store may be shared by all workers.
pub trait HistoryStore: Send + Sync {
    /// Drops every URL already recorded as completed or failed
    ///
    /// Order of the surviving URLs is preserved.
    fn remove_already_fetched(&self, urls: &[String], source: &str) -> HistoryResult<Vec<String>>;

    /// Returns the pending backlog for a source
    ///
    /// URLs that also appear in `completed` or `failed` are skipped.
    fn retrieve_pending(&self, source: &str) -> HistoryResult<Vec<String>>;

    /// Inserts URLs into `pending` if absent
    ///
    /// # Returns
    ///
    /// The number of rows actually inserted
    fn add_pending(&self, urls: &[String], source: &str) -> HistoryResult<usize>;

    /// Counts one more fetch attempt against each pending URL
    fn mark_attempted(&self, urls: &[String]) -> HistoryResult<()>;

    /// Records a terminal failure and removes the URL from `pending`
    fn record_failure(
        &self,
        outcome: &FetchOutcome,
        source: &str,
        when: DateTime<Utc>,
    ) -> HistoryResult<()>;

    /// Records a batch of successful outcomes in a single transaction
    ///
    /// # Returns
    ///
    /// The number of newly completed URLs
    fn record_completed(&self, outcomes: &[FetchOutcome]) -> HistoryResult<usize>;

    /// Appends an audit row for an article deleted as a duplicate
    fn record_duplicate(
        &self,
        url: &str,
        source: &str,
        pubdate: Option<DateTime<FixedOffset>>,
        filename: &str,
    ) -> HistoryResult<()>;

    /// Tables that currently hold the URL
    fn locate(&self, url: &str) -> HistoryResult<Vec<HistoryTable>>;

    /// Row counts per table and per source
    fn statistics(&self) -> HistoryResult<HistoryStatistics>;
}
