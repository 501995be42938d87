//! Source plugins and the generic crawl engine
//!
//! This module handles:
//! - The [`SourcePlugin`] contract every site integration implements
//! - Per-source classification data compiled from configuration
//! - The crawl state machine: URL discovery and article fetch/extract
//! - The registry mapping plugin names to constructors
//!
//! Site-specific behavior lives in plugins; everything else is shared by the
//! [`CrawlEngine`].

pub mod builtin;
pub mod dates;
pub mod engine;
pub mod extract;
pub mod filters;
pub mod ids;
mod outcome;
pub mod profile;
pub mod registry;
pub mod sweeper;

pub use builtin::{FeedAggregator, GenericNewsSource};
pub use dates::{DateCascade, DateFormat};
pub use engine::CrawlEngine;
pub use filters::apply_filters;
pub use ids::{extract_unique_id, IdPattern};
pub use outcome::{FetchOutcome, FetchStatus};
pub use profile::SourceProfile;
pub use registry::{Source, SourceDescriptor, SourceRegistry};
pub use sweeper::DuplicateSweeper;

use crate::crawler::NetworkFetcher;
use crate::state::SourceKind;
use crate::storage::HistoryStore;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use std::path::PathBuf;
use std::sync::Arc;

/// Per-run context handed to every source call
pub struct RunContext {
    pub run_date: NaiveDate,
    pub history: Arc<dyn HistoryStore>,
    /// Root directory for saved articles
    pub data_dir: PathBuf,
    /// Downloads smaller than this are treated as empty
    pub min_page_bytes: usize,
}

/// What the extraction step recovered from one document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedArticle {
    pub title: Option<String>,
    pub text: String,
    pub authors: Vec<String>,
    pub keywords: Vec<String>,
    pub industries: Vec<String>,
    pub publish_date: Option<DateTime<FixedOffset>>,
}

/// Result of a data-processing batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub examined: usize,
    pub removed: usize,
}

/// Contract between the crawl engine and a site integration
///
/// Only [`SourcePlugin::profile`] is required. Every other method has a
/// generic default that works for ordinary news sites.
#[async_trait]
pub trait SourcePlugin: Send + Sync {
    /// Classification data for this source
    fn profile(&self) -> &SourceProfile;

    fn name(&self) -> &str {
        &self.profile().name
    }

    fn kind(&self) -> SourceKind {
        self.profile().kind
    }

    /// Extra article URLs found from the main URL by site-specific means
    async fn discover_articles(
        &self,
        _main_url: &str,
        _fetcher: &NetworkFetcher,
    ) -> crate::Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Primary extraction of an article page
    fn extract_article(&self, _url: &str, html: &str) -> Option<ExtractedArticle> {
        extract::extract_article(html)
    }

    /// Author recovery used when the primary extraction looks malformed
    fn extract_authors(&self, html: &str) -> Vec<String> {
        extract::extract_authors(html)
    }

    /// Categories for an article
    fn extract_industries(&self, _url: &str, html: &str) -> Vec<String> {
        extract::extract_industries(html)
    }

    /// Body text used when the primary extraction produced nothing
    fn extract_body_fallback(&self, html: &str) -> Option<String> {
        extract::extract_body_fallback(html)
    }

    fn clean_text(&self, text: &str) -> String {
        extract::clean_text(text)
    }

    /// Batch entry point for data-processing sources
    async fn process_batch(&self, _ctx: &RunContext) -> crate::Result<BatchReport> {
        Ok(BatchReport::default())
    }
}
