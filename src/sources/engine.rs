//! The crawl state machine shared by every source
//!
//! Discovery builds a source's candidate URL list for the run date; retrieval
//! fetches and extracts one article at a time. Neither step returns an error:
//! failures are logged and degrade to fewer URLs or an unsuccessful outcome.

use crate::config::MAX_RECURSION_LEVEL;
use crate::crawler::{extract_links, parse_feed_links, NetworkFetcher};
use crate::output::{write_article, ArticleRecord};
use crate::sources::extract::looks_malformed;
use crate::sources::filters::{apply_filters, passes_deny_list};
use crate::sources::{
    extract_unique_id, BatchReport, ExtractedArticle, FetchOutcome, FetchStatus, RunContext,
    SourcePlugin, SourceProfile,
};
use crate::url::{url_in_domains, UrlSet};
use chrono::Utc;
use std::sync::Arc;

/// Drives one source plugin through discovery and retrieval
#[derive(Clone)]
pub struct CrawlEngine {
    plugin: Arc<dyn SourcePlugin>,
    fetcher: Arc<NetworkFetcher>,
}

impl CrawlEngine {
    pub fn new(plugin: Arc<dyn SourcePlugin>, fetcher: Arc<NetworkFetcher>) -> Self {
        Self { plugin, fetcher }
    }

    pub fn plugin(&self) -> &dyn SourcePlugin {
        self.plugin.as_ref()
    }

    pub fn profile(&self) -> &SourceProfile {
        self.plugin.profile()
    }

    pub fn name(&self) -> &str {
        self.plugin.name()
    }

    /// Builds the list of URLs this source should fetch for the run
    ///
    /// # Discovery Steps
    ///
    /// 1. Item links from every configured feed
    /// 2. Links found by the plugin's own article discovery
    /// 3. Outbound links of the main URL and the non-content index pages
    /// 4. The pending backlog from session history
    /// 5. Link expansion up to the recursion level; level 1 is the fresh
    ///    links of steps 1-3 that pass the deny list
    /// 6. The allow/deny/non-content filter cascade
    /// 7. Removal of URLs already completed or failed
    ///
    /// Content-fetching sources write the survivors to `pending` before
    /// returning them.
    pub async fn discover_urls(&self, ctx: &RunContext) -> Vec<String> {
        let profile = self.profile();
        let source = profile.name.as_str();
        let mut crawled = UrlSet::new();
        let mut fresh = UrlSet::new();

        for feed in &profile.feeds {
            let links = self.feed_links(feed, source).await;
            tracing::debug!(source, "Feed {} listed {} links", feed, links.len());
            fresh.extend(links);
        }

        if let Some(main_url) = &profile.main_url {
            match self.plugin.discover_articles(main_url, &self.fetcher).await {
                Ok(links) => {
                    fresh.extend(links);
                }
                Err(e) => {
                    tracing::warn!(source, "Article discovery failed for {}: {}", main_url, e);
                }
            }
        }

        for index in profile.main_url.iter().chain(profile.non_content_urls.iter()) {
            let links = self.page_links(index, source, &mut crawled).await;
            fresh.extend(links);
        }

        let backlog = match ctx.history.retrieve_pending(source) {
            Ok(urls) => urls,
            Err(e) => {
                tracing::warn!(source, "Could not read pending backlog: {}", e);
                Vec::new()
            }
        };
        if !backlog.is_empty() {
            tracing::info!(source, "Resuming {} pending URLs", backlog.len());
        }

        let mut frontier: Vec<String> = fresh
            .iter()
            .filter(|url| passes_deny_list(url, &profile.invalid_patterns))
            .cloned()
            .collect();
        let mut seen = fresh;
        seen.extend(backlog);

        let depth = profile.recursion_level.clamp(1, MAX_RECURSION_LEVEL);
        for level in 2..=depth {
            let mut next = Vec::new();
            for url in &frontier {
                for link in self.page_links(url, source, &mut crawled).await {
                    if seen.insert(link.clone())
                        && passes_deny_list(&link, &profile.invalid_patterns)
                    {
                        next.push(link);
                    }
                }
            }

            tracing::debug!(source, "Recursion level {} found {} new URLs", level, next.len());
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        let candidates = apply_filters(seen.into_vec(), profile);

        let remaining = match ctx.history.remove_already_fetched(&candidates, source) {
            Ok(urls) => urls,
            Err(e) => {
                tracing::warn!(source, "History filtering failed, keeping all candidates: {}", e);
                candidates
            }
        };

        if profile.kind.fetches_content() {
            if let Err(e) = ctx.history.add_pending(&remaining, source) {
                tracing::warn!(source, "Could not record pending URLs: {}", e);
            }
        }

        tracing::info!(source, "Discovered {} candidate URLs", remaining.len());
        remaining
    }

    /// Fetches one article, extracts it and saves it when it is usable
    pub async fn fetch_and_extract(&self, url: &str, ctx: &RunContext) -> FetchOutcome {
        let profile = self.profile();
        let source = profile.name.as_str();

        if profile.is_non_content(url) {
            tracing::debug!(source, "Skipping non-content URL {}", url);
            return FetchOutcome::unsuccessful(url, source, FetchStatus::NonContentUrl);
        }

        let page = match self.fetcher.fetch(url, source).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(source, "Fetch failed: {}", e);
                return FetchOutcome::unsuccessful(url, source, FetchStatus::NetworkFailure);
            }
        };

        let mut outcome = FetchOutcome::unsuccessful(url, source, FetchStatus::NoContent);
        outcome.raw_size = page.bytes.len();
        if page.bytes.len() < ctx.min_page_bytes {
            tracing::debug!(source, "{} returned only {} bytes", url, page.bytes.len());
            return outcome;
        }

        outcome.additional_links = extract_links(&page.text, &page.final_url)
            .into_iter()
            .filter(|link| url_in_domains(link, &profile.allowed_domains))
            .collect();

        let extracted = self
            .plugin
            .extract_article(url, &page.text)
            .filter(|article| !article.text.trim().is_empty())
            .or_else(|| {
                self.plugin
                    .extract_body_fallback(&page.text)
                    .map(|text| ExtractedArticle {
                        text,
                        ..ExtractedArticle::default()
                    })
            });
        let Some(mut article) = extracted else {
            tracing::debug!(source, "Nothing extracted from {}", url);
            outcome.status = FetchStatus::ExtractionFailed;
            return outcome;
        };

        article.text = self.plugin.clean_text(&article.text);
        outcome.text_size = article.text.len();

        if article.publish_date.is_none() {
            article.publish_date = profile
                .date_cascade
                .find_publish_date(&page.text, Utc::now());
        }
        let Some(publish_date) = article.publish_date else {
            tracing::debug!(source, "No publish date for {}", url);
            outcome.status = FetchStatus::NoPublishDate;
            return outcome;
        };
        outcome.publish_date = Some(publish_date);

        if article.authors.iter().any(|author| looks_malformed(author)) {
            article.authors = self
                .plugin
                .extract_authors(&page.text)
                .into_iter()
                .filter(|author| !looks_malformed(author))
                .collect();
        }
        if article.industries.is_empty() {
            article.industries = self.plugin.extract_industries(url, &page.text);
        }

        let Some(article_id) = extract_unique_id(url, &profile.id_patterns) else {
            tracing::warn!(source, "No unique ID for {}", url);
            outcome.status = FetchStatus::NoUniqueId;
            return outcome;
        };
        outcome.article_id = Some(article_id.clone());

        if article.text.chars().count() <= profile.min_content_length {
            tracing::debug!(
                source,
                "Text of {} too short ({} chars)",
                url,
                article.text.chars().count()
            );
            outcome.status = FetchStatus::TooShort;
            return outcome;
        }

        let record = ArticleRecord {
            url: url.to_string(),
            source: source.to_string(),
            article_id,
            title: article.title,
            text: article.text,
            authors: article.authors,
            keywords: article.keywords,
            industries: article.industries,
            publish_date: Some(publish_date),
            fetched_at: Utc::now(),
            raw_size: outcome.raw_size,
        };

        match write_article(&ctx.data_dir, ctx.run_date, &record) {
            Ok(path) => {
                tracing::debug!(source, "Saved {} to {}", url, path.display());
                outcome.status = FetchStatus::Saved;
                outcome.saved_path = Some(path);
            }
            Err(e) => {
                tracing::error!(source, "Failed to save {}: {}", url, e);
                outcome.status = FetchStatus::SaveFailed;
            }
        }

        outcome
    }

    /// Runs the plugin's batch-processing entry point
    pub async fn process_batch(&self, ctx: &RunContext) -> crate::Result<BatchReport> {
        self.plugin.process_batch(ctx).await
    }

    async fn feed_links(&self, feed: &str, source: &str) -> Vec<String> {
        let page = match self.fetcher.fetch(feed, source).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(source, "Feed unavailable: {}", e);
                return Vec::new();
            }
        };

        match parse_feed_links(&page.text) {
            Ok(links) => links,
            Err(e) => {
                tracing::warn!(source, "Could not parse feed {}: {}", feed, e);
                Vec::new()
            }
        }
    }

    /// Outbound links of a page, restricted to the allowed domains
    ///
    /// Pages already crawled this run are not fetched again.
    async fn page_links(&self, url: &str, source: &str, crawled: &mut UrlSet) -> Vec<String> {
        if !crawled.insert(url) {
            return Vec::new();
        }

        match self.fetcher.fetch(url, source).await {
            Ok(page) => extract_links(&page.text, &page.final_url)
                .into_iter()
                .filter(|link| url_in_domains(link, &self.profile().allowed_domains))
                .collect(),
            Err(e) => {
                tracing::warn!(source, "Link extraction skipped: {}", e);
                Vec::new()
            }
        }
    }
}
