//! SQLite session history
//!
//! Every operation takes the process-wide history guard, opens its own
//! connection, and drops both before returning. The database keeps the
//! default rollback journal, so a journal file on disk outside an operation
//! means a previous writer died mid-transaction.
//!
//! URLs are matched by their dedup key, so spellings that differ only in
//! host case, fragment or trailing slash share one history entry.

use crate::sources::FetchOutcome;
use crate::storage::schema::{initialize_schema, SWEEP_PENDING_SQL};
use crate::storage::traits::{HistoryError, HistoryResult, HistoryStore};
use crate::storage::{HistoryStatistics, HistoryTable, SourceCounts};
use crate::url::dedup_key;
use chrono::{DateTime, FixedOffset, Utc};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Serializes all access to the history database within the process
static HISTORY_GUARD: Mutex<()> = Mutex::new(());

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// SQLite-backed session history
#[derive(Debug, Clone)]
pub struct SqliteHistory {
    path: PathBuf,
}

impl SqliteHistory {
    /// Opens (creating if needed) the history database at `path`
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteHistory)` - Schema is in place and no unclean shutdown was found
    /// * `Err(HistoryError::UncleanShutdown)` - A `-journal` or `-wal` file was left behind
    pub fn open(path: &Path) -> HistoryResult<Self> {
        check_clean_shutdown(path)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let history = Self {
            path: path.to_path_buf(),
        };
        history.with_connection(|conn| {
            initialize_schema(conn)?;
            Ok(())
        })?;

        Ok(history)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> HistoryResult<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        Ok(conn)
    }

    /// Runs `op` on a fresh connection while holding the history guard
    ///
    /// The guard and connection are released when this returns, whether or
    /// not `op` failed. A poisoned guard is recovered since it protects no data.
    fn with_connection<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> HistoryResult<T>,
    ) -> HistoryResult<T> {
        let _guard = HISTORY_GUARD.lock().unwrap_or_else(PoisonError::into_inner);
        let mut conn = self.connect()?;
        op(&mut conn)
    }
}

/// Refuses to open a database that still has a rollback journal or WAL beside it
fn check_clean_shutdown(path: &Path) -> HistoryResult<()> {
    for suffix in ["-journal", "-wal"] {
        let mut leftover = path.as_os_str().to_owned();
        leftover.push(suffix);
        let leftover = PathBuf::from(leftover);

        if leftover.exists() {
            return Err(HistoryError::UncleanShutdown { path: leftover });
        }
    }
    Ok(())
}

fn is_terminal(conn: &Connection, url: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM completed WHERE url_key = ?1)
             OR EXISTS(SELECT 1 FROM failed WHERE url_key = ?1)",
        params![dedup_key(url)],
        |row| row.get(0),
    )
}

impl HistoryStore for SqliteHistory {
    fn remove_already_fetched(&self, urls: &[String], _source: &str) -> HistoryResult<Vec<String>> {
        self.with_connection(|conn| {
            let mut remaining = Vec::with_capacity(urls.len());
            for url in urls {
                if !is_terminal(conn, url)? {
                    remaining.push(url.clone());
                }
            }
            Ok(remaining)
        })
    }

    fn retrieve_pending(&self, source: &str) -> HistoryResult<Vec<String>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT url FROM pending
                 WHERE source = ?1
                   AND url_key NOT IN (SELECT url_key FROM completed)
                   AND url_key NOT IN (SELECT url_key FROM failed)
                 ORDER BY added_at, rowid",
            )?;
            let urls = stmt
                .query_map(params![source], |row| row.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(urls)
        })
    }

    fn add_pending(&self, urls: &[String], source: &str) -> HistoryResult<usize> {
        let now = Utc::now().to_rfc3339();
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut stmt = tx.prepare(
                    "INSERT OR IGNORE INTO pending (url, url_key, source, attempts, added_at)
                     VALUES (?1, ?2, ?3, 0, ?4)",
                )?;
                for url in urls {
                    inserted += stmt.execute(params![url, dedup_key(url), source, now])?;
                }
            }
            tx.execute(SWEEP_PENDING_SQL, [])?;
            tx.commit()?;
            Ok(inserted)
        })
    }

    fn mark_attempted(&self, urls: &[String]) -> HistoryResult<()> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt =
                    tx.prepare("UPDATE pending SET attempts = attempts + 1 WHERE url_key = ?1")?;
                for url in urls {
                    stmt.execute(params![dedup_key(url)])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn record_failure(
        &self,
        outcome: &FetchOutcome,
        source: &str,
        when: DateTime<Utc>,
    ) -> HistoryResult<()> {
        let key = dedup_key(&outcome.url);
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR IGNORE INTO failed (url, url_key, source, failed_at)
                 SELECT ?1, ?2, ?3, ?4
                 WHERE NOT EXISTS (SELECT 1 FROM completed WHERE url_key = ?2)",
                params![outcome.url, key, source, when.to_rfc3339()],
            )?;
            tx.execute("DELETE FROM pending WHERE url_key = ?1", params![key])?;
            tx.execute(SWEEP_PENDING_SQL, [])?;
            tx.commit()?;
            Ok(())
        })
    }

    fn record_completed(&self, outcomes: &[FetchOutcome]) -> HistoryResult<usize> {
        let now = Utc::now().to_rfc3339();
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;
            {
                let mut insert = tx.prepare(
                    "INSERT OR IGNORE INTO completed
                         (url, url_key, source, pubdate, raw_size, text_size, completed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                let mut unfail = tx.prepare("DELETE FROM failed WHERE url_key = ?1")?;
                let mut unpend = tx.prepare("DELETE FROM pending WHERE url_key = ?1")?;

                for outcome in outcomes {
                    let key = dedup_key(&outcome.url);
                    inserted += insert.execute(params![
                        outcome.url,
                        key,
                        outcome.source,
                        outcome.publish_date.map(|d| d.to_rfc3339()),
                        outcome.raw_size as i64,
                        outcome.text_size as i64,
                        now,
                    ])?;
                    unfail.execute(params![key])?;
                    unpend.execute(params![key])?;
                }
            }
            tx.execute(SWEEP_PENDING_SQL, [])?;
            tx.commit()?;
            Ok(inserted)
        })
    }

    fn record_duplicate(
        &self,
        url: &str,
        source: &str,
        pubdate: Option<DateTime<FixedOffset>>,
        filename: &str,
    ) -> HistoryResult<()> {
        let now = Utc::now().to_rfc3339();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO deleted_duplicates (url, source, pubdate, filename, deleted_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![url, source, pubdate.map(|d| d.to_rfc3339()), filename, now],
            )?;
            Ok(())
        })
    }

    fn locate(&self, url: &str) -> HistoryResult<Vec<HistoryTable>> {
        let key = dedup_key(url);
        self.with_connection(|conn| {
            let mut tables = Vec::new();
            for table in HistoryTable::all() {
                let sql = format!(
                    "SELECT EXISTS(SELECT 1 FROM {} WHERE url_key = ?1)",
                    table.table_name()
                );
                let present: bool = conn.query_row(&sql, params![key], |row| row.get(0))?;
                if present {
                    tables.push(table);
                }
            }
            Ok(tables)
        })
    }

    fn statistics(&self) -> HistoryResult<HistoryStatistics> {
        self.with_connection(|conn| {
            let mut stats = HistoryStatistics::default();

            for table in HistoryTable::all()
                .into_iter()
                .chain([HistoryTable::DeletedDuplicates])
            {
                let sql = format!(
                    "SELECT source, COUNT(*) FROM {} GROUP BY source",
                    table.table_name()
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;

                for (source, count) in rows {
                    let count = count as u64;
                    let entry: &mut SourceCounts = stats.per_source.entry(source).or_default();
                    match table {
                        HistoryTable::Completed => {
                            entry.completed = count;
                            stats.completed += count;
                        }
                        HistoryTable::Pending => {
                            entry.pending = count;
                            stats.pending += count;
                        }
                        HistoryTable::Failed => {
                            entry.failed = count;
                            stats.failed += count;
                        }
                        HistoryTable::DeletedDuplicates => {
                            entry.duplicates = count;
                            stats.duplicates += count;
                        }
                    }
                }
            }

            Ok(stats)
        })
    }
}
