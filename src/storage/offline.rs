//! Session history stand-in for tests

use crate::sources::FetchOutcome;
use crate::storage::{HistoryError, HistoryResult, HistoryStatistics, HistoryStore, HistoryTable};
use chrono::{DateTime, FixedOffset, Utc};
use std::io;

/// A store whose every operation fails
pub struct OfflineHistory;

fn offline<T>() -> HistoryResult<T> {
    Err(HistoryError::Io(io::Error::new(
        io::ErrorKind::Other,
        "history offline",
    )))
}

impl HistoryStore for OfflineHistory {
    fn remove_already_fetched(&self, _: &[String], _: &str) -> HistoryResult<Vec<String>> {
        offline()
    }

    fn retrieve_pending(&self, _: &str) -> HistoryResult<Vec<String>> {
        offline()
    }

    fn add_pending(&self, _: &[String], _: &str) -> HistoryResult<usize> {
        offline()
    }

    fn mark_attempted(&self, _: &[String]) -> HistoryResult<()> {
        offline()
    }

    fn record_failure(&self, _: &FetchOutcome, _: &str, _: DateTime<Utc>) -> HistoryResult<()> {
        offline()
    }

    fn record_completed(&self, _: &[FetchOutcome]) -> HistoryResult<usize> {
        offline()
    }

    fn record_duplicate(
        &self,
        _: &str,
        _: &str,
        _: Option<DateTime<FixedOffset>>,
        _: &str,
    ) -> HistoryResult<()> {
        offline()
    }

    fn locate(&self, _: &str) -> HistoryResult<Vec<HistoryTable>> {
        offline()
    }

    fn statistics(&self) -> HistoryResult<HistoryStatistics> {
        offline()
    }
}
