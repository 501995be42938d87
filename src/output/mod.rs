//! Article output and crawl reporting
//!
//! This module handles:
//! - The JSON record written for every saved article
//! - Where article files live under the data directory
//! - Run metrics and session history statistics (see [`stats`])

pub mod stats;

pub use stats::{format_statistics, print_statistics, CrawlMetrics, SourceMetrics};

use crate::Result;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One extracted article as written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub url: String,
    pub source: String,
    pub article_id: String,
    pub title: Option<String>,
    pub text: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub industries: Vec<String>,
    pub publish_date: Option<DateTime<FixedOffset>>,
    pub fetched_at: DateTime<Utc>,
    pub raw_size: usize,
}

/// Path of an article file: `<data-dir>/<source>/<run-date>/<source>_<id>.json`
pub fn article_path(
    data_dir: &Path,
    source: &str,
    run_date: NaiveDate,
    article_id: &str,
) -> PathBuf {
    data_dir
        .join(source)
        .join(run_date.format("%Y-%m-%d").to_string())
        .join(format!("{}_{}.json", source, article_id))
}

/// Writes an article record as pretty JSON, creating directories as needed
///
/// The record is written to a temporary file first and renamed into place,
/// so a crash never leaves a truncated article behind.
///
/// # Returns
///
/// * `Ok(PathBuf)` - Where the record was written
/// * `Err(GleanError)` - Serialization or filesystem failure
pub fn write_article(
    data_dir: &Path,
    run_date: NaiveDate,
    record: &ArticleRecord,
) -> Result<PathBuf> {
    let path = article_path(data_dir, &record.source, run_date, &record.article_id);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(record)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, &path)?;

    Ok(path)
}

/// Reads an article record written by [`write_article`]
pub fn read_article(path: &Path) -> Result<ArticleRecord> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Lists every article file saved for `run_date`, across all sources, sorted by path
pub fn list_articles(data_dir: &Path, run_date: NaiveDate) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    if !data_dir.exists() {
        return Ok(paths);
    }

    let day = run_date.format("%Y-%m-%d").to_string();
    for source_dir in std::fs::read_dir(data_dir)? {
        let day_dir = source_dir?.path().join(&day);
        if !day_dir.is_dir() {
            continue;
        }

        for entry in std::fs::read_dir(&day_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
    }

    paths.sort();
    Ok(paths)
}
