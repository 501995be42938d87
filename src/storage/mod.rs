//! Session history for resumable crawls
//!
//! This module records the progress of every discovered URL:
//! - `completed`: terminal successes
//! - `pending`: discovered URLs awaiting a terminal outcome, kept across restarts
//! - `failed`: terminal failures, never retried automatically
//! - `deleted_duplicates`: audit trail of articles removed as duplicates
//!
//! A URL may sit in `pending` and one terminal table only until the sweep
//! that follows every write removes the pending row.

#[cfg(test)]
mod offline;
mod schema;
mod sqlite;
mod traits;

#[cfg(test)]
pub(crate) use offline::OfflineHistory;
pub use sqlite::SqliteHistory;
pub use traits::{HistoryError, HistoryResult, HistoryStore};

use std::collections::BTreeMap;
use std::path::Path;

/// Opens the session history database, refusing one left by an unclean shutdown
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_history(path: &Path) -> HistoryResult<SqliteHistory> {
    SqliteHistory::open(path)
}

/// The history tables a URL can be recorded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryTable {
    Completed,
    Pending,
    Failed,
    DeletedDuplicates,
}

impl HistoryTable {
    /// The tables that track URL progress
    pub fn all() -> [Self; 3] {
        [Self::Completed, Self::Pending, Self::Failed]
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Pending => "pending",
            Self::Failed => "failed",
            Self::DeletedDuplicates => "deleted_duplicates",
        }
    }
}

/// Row counts for one source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceCounts {
    pub completed: u64,
    pub pending: u64,
    pub failed: u64,
    pub duplicates: u64,
}

/// Row counts across the whole history
#[derive(Debug, Clone, Default)]
pub struct HistoryStatistics {
    pub completed: u64,
    pub pending: u64,
    pub failed: u64,
    pub duplicates: u64,
    pub per_source: BTreeMap<String, SourceCounts>,
}
