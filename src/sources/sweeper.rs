//! Duplicate article sweeper
//!
//! A data-processing source that removes saved articles whose text repeats
//! an earlier article of the same run date, across all sources.

use crate::output::{list_articles, read_article};
use crate::sources::{BatchReport, RunContext, SourcePlugin, SourceProfile};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Keeps the earliest copy of each article text and deletes the rest
pub struct DuplicateSweeper {
    profile: SourceProfile,
}

impl DuplicateSweeper {
    pub fn new(profile: SourceProfile) -> Self {
        Self { profile }
    }
}

fn text_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl SourcePlugin for DuplicateSweeper {
    fn profile(&self) -> &SourceProfile {
        &self.profile
    }

    /// Hashes every article saved for the run date
    ///
    /// Articles are ordered by fetch time (then path) so the first one saved
    /// survives. A duplicate is recorded in the audit table before its file is
    /// deleted; a failure on one file is logged and the sweep moves on.
    async fn process_batch(&self, ctx: &RunContext) -> crate::Result<BatchReport> {
        let mut articles = Vec::new();
        for path in list_articles(&ctx.data_dir, ctx.run_date)? {
            match read_article(&path) {
                Ok(record) => articles.push((record, path)),
                Err(e) => tracing::warn!("Skipping unreadable article {}: {}", path.display(), e),
            }
        }
        articles.sort_by(|(a, a_path), (b, b_path)| {
            a.fetched_at
                .cmp(&b.fetched_at)
                .then_with(|| a_path.cmp(b_path))
        });

        let mut report = BatchReport::default();
        let mut digests = HashSet::new();

        for (record, path) in articles {
            report.examined += 1;
            if digests.insert(text_digest(&record.text)) {
                continue;
            }

            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let source = record.source.as_str();

            // no file is deleted without its audit row
            let audit = ctx
                .history
                .record_duplicate(&record.url, source, record.publish_date, &filename);
            if let Err(e) = audit {
                tracing::warn!(source, "Keeping duplicate {}, audit failed: {}", filename, e);
                continue;
            }
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(source, "Could not delete duplicate {}: {}", path.display(), e);
                continue;
            }

            tracing::info!(source, "Removed duplicate article {}", filename);
            report.removed += 1;
        }

        tracing::info!(
            "Duplicate sweep examined {} articles, removed {}",
            report.examined,
            report.removed
        );
        Ok(report)
    }
}
