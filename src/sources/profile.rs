//! Per-source classification data compiled from configuration

use crate::config::SourceConfig;
use crate::sources::dates::DateCascade;
use crate::sources::ids::IdPattern;
use crate::state::SourceKind;
use crate::url::{dedup_key, strip_query};
use crate::ConfigError;
use std::collections::HashSet;

/// Everything a source needs to classify and date URLs
///
/// Each instance owns its compiled patterns; nothing is shared between
/// sources or carried over between runs.
#[derive(Debug, Clone)]
pub struct SourceProfile {
    pub name: String,
    pub kind: SourceKind,
    pub main_url: Option<String>,
    pub feeds: Vec<String>,
    pub non_content_urls: Vec<String>,
    pub non_content_markers: Vec<String>,
    pub valid_patterns: Vec<String>,
    pub invalid_patterns: Vec<String>,
    pub allowed_domains: Vec<String>,
    pub min_content_length: usize,
    pub recursion_level: u32,
    pub id_patterns: Vec<IdPattern>,
    pub date_cascade: DateCascade,
    non_content_keys: HashSet<String>,
}

impl SourceProfile {
    /// Builds a profile from a source section
    ///
    /// # Arguments
    ///
    /// * `config` - The `[[source]]` section
    /// * `default_recursion` - `crawler.recursion-level`, used when the source sets none
    pub fn from_config(config: &SourceConfig, default_recursion: u32) -> Result<Self, ConfigError> {
        let id_patterns = config
            .id_patterns
            .iter()
            .map(|p| {
                IdPattern::new(&p.pattern, p.group).map_err(|e| {
                    ConfigError::InvalidPattern(format!("id pattern '{}': {}", p.pattern, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let date_cascade = DateCascade::from_config(&config.date_patterns)?;

        // The front page is always an index page
        let non_content_keys = config
            .main_url
            .iter()
            .chain(config.non_content_urls.iter())
            .map(|url| dedup_key(strip_query(url)))
            .collect();

        Ok(Self {
            name: config.name.clone(),
            kind: config.kind,
            main_url: config.main_url.clone(),
            feeds: config.feeds.clone(),
            non_content_urls: config.non_content_urls.clone(),
            non_content_markers: config.non_content_markers.clone(),
            valid_patterns: config.valid_patterns.clone(),
            invalid_patterns: config.invalid_patterns.clone(),
            allowed_domains: config.allowed_domains.clone(),
            min_content_length: config.min_content_length,
            recursion_level: config.recursion_level.unwrap_or(default_recursion),
            id_patterns,
            date_cascade,
            non_content_keys,
        })
    }

    /// True for index/listing pages and URLs containing a non-content marker
    ///
    /// Query strings are ignored on both sides of the comparison.
    pub fn is_non_content(&self, url: &str) -> bool {
        let stripped = strip_query(url);
        self.non_content_keys.contains(&dedup_key(stripped))
            || self
                .non_content_markers
                .iter()
                .any(|marker| stripped.contains(marker.as_str()))
    }
}
