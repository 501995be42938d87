use crate::state::SourceKind;
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Gleaner
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    pub history: HistoryConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceConfig>,
}

/// Crawl-wide behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of worker tasks started for each phase
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Default link-expansion depth for sources that don't set their own (1-4)
    #[serde(rename = "recursion-level", default = "default_recursion_level")]
    pub recursion_level: u32,

    /// Downloads smaller than this many bytes are treated as having no content
    #[serde(rename = "min-page-bytes", default = "default_min_page_bytes")]
    pub min_page_bytes: usize,

    /// Date the crawl is run for; today when absent
    #[serde(rename = "run-date", default)]
    pub run_date: Option<NaiveDate>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            recursion_level: default_recursion_level(),
            min_page_bytes: default_min_page_bytes(),
            run_date: None,
        }
    }
}

/// Network fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    /// Attempts per request before giving up
    #[serde(rename = "retry-count", default = "default_retry_count")]
    pub retry_count: u32,

    /// Fixed pause after every attempt (seconds)
    #[serde(rename = "retry-wait", default = "default_retry_wait")]
    pub retry_wait: f64,

    /// Lower bound of the random pause added to `retry-wait` (seconds)
    #[serde(rename = "min-jitter", default)]
    pub min_jitter: f64,

    /// Upper bound of the random pause added to `retry-wait` (seconds)
    #[serde(rename = "max-jitter", default = "default_max_jitter")]
    pub max_jitter: f64,

    #[serde(rename = "connect-timeout", default = "default_connect_timeout")]
    pub connect_timeout: f64,

    #[serde(rename = "read-timeout", default = "default_read_timeout")]
    pub read_timeout: f64,

    /// Pipe-delimited user-agent strings used round-robin
    #[serde(rename = "user-agents", default = "default_user_agents")]
    pub user_agents: String,

    /// Proxy URLs used round-robin; direct connections when empty
    #[serde(default)]
    pub proxies: Vec<String>,
}

impl NetworkConfig {
    /// Splits the pipe-delimited user-agent setting into its entries
    pub fn user_agent_list(&self) -> Vec<String> {
        self.user_agents
            .split('|')
            .map(str::trim)
            .filter(|agent| !agent.is_empty())
            .map(String::from)
            .collect()
    }

    /// Out-of-range values (negative, NaN, infinite) fall back to the default
    pub fn retry_wait_duration(&self) -> Duration {
        seconds_or(self.retry_wait, default_retry_wait())
    }

    pub fn connect_timeout_duration(&self) -> Duration {
        seconds_or(self.connect_timeout, default_connect_timeout())
    }

    pub fn read_timeout_duration(&self) -> Duration {
        seconds_or(self.read_timeout, default_read_timeout())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_wait: default_retry_wait(),
            min_jitter: 0.0,
            max_jitter: default_max_jitter(),
            connect_timeout: default_connect_timeout(),
            read_timeout: default_read_timeout(),
            user_agents: default_user_agents(),
            proxies: Vec::new(),
        }
    }
}

/// Session history configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory extracted articles are written under
    #[serde(rename = "data-dir")]
    pub data_dir: String,
}

/// One configured crawl source
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Unique source name
    pub name: String,

    pub kind: SourceKind,

    /// Name of the registered plugin that drives this source
    pub plugin: String,

    /// Front page crawled for links
    #[serde(rename = "main-url")]
    pub main_url: Option<String>,

    /// RSS or Atom endpoints read for item links
    pub feeds: Vec<String>,

    /// Index and listing pages that are crawled but never fetched as articles
    #[serde(rename = "non-content-urls")]
    pub non_content_urls: Vec<String>,

    /// Substrings marking a URL as non-content
    #[serde(rename = "non-content-markers")]
    pub non_content_markers: Vec<String>,

    /// At least one of these must match when the list is non-empty
    #[serde(rename = "valid-patterns")]
    pub valid_patterns: Vec<String>,

    /// URLs matching any of these are dropped
    #[serde(rename = "invalid-patterns")]
    pub invalid_patterns: Vec<String>,

    /// Domain patterns ("example.com" or "*.example.com") this source owns
    #[serde(rename = "allowed-domains")]
    pub allowed_domains: Vec<String>,

    /// Extracted text must be longer than this to be saved
    #[serde(rename = "min-content-length")]
    pub min_content_length: usize,

    #[serde(rename = "id-patterns")]
    pub id_patterns: Vec<IdPatternConfig>,

    #[serde(rename = "date-patterns")]
    pub date_patterns: Vec<DatePatternConfig>,

    /// Overrides `crawler.recursion-level` for this source
    #[serde(rename = "recursion-level")]
    pub recursion_level: Option<u32>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: SourceKind::default(),
            plugin: default_plugin(),
            main_url: None,
            feeds: Vec::new(),
            non_content_urls: Vec::new(),
            non_content_markers: Vec::new(),
            valid_patterns: Vec::new(),
            invalid_patterns: Vec::new(),
            allowed_domains: Vec::new(),
            min_content_length: default_min_content_length(),
            id_patterns: Vec::new(),
            date_patterns: Vec::new(),
            recursion_level: None,
        }
    }
}

/// URL regex exposing an article identifier
#[derive(Debug, Clone, Deserialize)]
pub struct IdPatternConfig {
    pub pattern: String,
    #[serde(default = "default_group")]
    pub group: usize,
}

/// Regex recovering a publish date from the raw document
#[derive(Debug, Clone, Deserialize)]
pub struct DatePatternConfig {
    pub pattern: String,
    #[serde(default = "default_group")]
    pub group: usize,
    /// `rfc2822`, `rfc3339`, or a chrono format string
    pub format: String,
}

fn seconds_or(value: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(value)
        .or_else(|_| Duration::try_from_secs_f64(fallback))
        .unwrap_or(Duration::ZERO)
}

fn default_workers() -> usize {
    4
}

fn default_recursion_level() -> u32 {
    1
}

fn default_min_page_bytes() -> usize {
    512
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_wait() -> f64 {
    2.0
}

fn default_max_jitter() -> f64 {
    1.0
}

fn default_connect_timeout() -> f64 {
    10.0
}

fn default_read_timeout() -> f64 {
    30.0
}

fn default_user_agents() -> String {
    "Mozilla/5.0 (compatible; Gleaner/0.1)".to_string()
}

fn default_plugin() -> String {
    "generic-news".to_string()
}

fn default_min_content_length() -> usize {
    400
}

fn default_group() -> usize {
    1
}
