//! Database schema definitions
//!
//! This module contains the SQL schema for the Gleaner session history.
//!
//! `url` keeps the spelling a URL was discovered under; `url_key` is its
//! dedup key and is what every lookup, sweep and uniqueness check uses.

/// SQL schema for the session history
pub const SCHEMA_SQL: &str = r#"
-- Terminal successes
CREATE TABLE IF NOT EXISTS completed (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    url_key TEXT NOT NULL,
    source TEXT NOT NULL,
    pubdate TEXT,
    raw_size INTEGER NOT NULL DEFAULT 0,
    text_size INTEGER NOT NULL DEFAULT 0,
    completed_at TEXT NOT NULL,
    UNIQUE(url_key, source)
);

CREATE INDEX IF NOT EXISTS idx_completed_key ON completed(url_key);

-- Discovered but not yet completed or failed; survives restarts
CREATE TABLE IF NOT EXISTS pending (
    url TEXT PRIMARY KEY,
    url_key TEXT NOT NULL UNIQUE,
    source TEXT NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 0,
    added_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pending_source ON pending(source);

-- Terminal failures; never retried automatically
CREATE TABLE IF NOT EXISTS failed (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    url_key TEXT NOT NULL,
    source TEXT NOT NULL,
    failed_at TEXT NOT NULL,
    UNIQUE(url_key, source)
);

CREATE INDEX IF NOT EXISTS idx_failed_key ON failed(url_key);

-- Audit trail of articles dropped as duplicates
CREATE TABLE IF NOT EXISTS deleted_duplicates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    source TEXT NOT NULL,
    pubdate TEXT,
    filename TEXT NOT NULL,
    deleted_at TEXT NOT NULL
);
"#;

/// Removes pending rows for URLs that already reached a terminal table
pub const SWEEP_PENDING_SQL: &str = "
    DELETE FROM pending
    WHERE url_key IN (SELECT url_key FROM completed)
       OR url_key IN (SELECT url_key FROM failed)
";

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
