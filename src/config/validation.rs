use crate::config::types::{
    Config, CrawlerConfig, HistoryConfig, NetworkConfig, OutputConfig, SourceConfig,
};
use crate::state::SourceKind;
use crate::ConfigError;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// Deepest link expansion a source may configure
pub const MAX_RECURSION_LEVEL: u32 = 4;

/// Workers allowed per available core before the configuration is rejected
pub const WORKERS_PER_CORE: usize = 3;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_network_config(&config.network)?;
    validate_history_config(&config.history)?;
    validate_output_config(&config.output)?;
    validate_sources(&config.sources)?;
    Ok(())
}

/// Checks the configured worker count against the available cores
///
/// # Arguments
///
/// * `configured` - Worker count from the configuration
/// * `cores` - Available parallelism reported by the host
///
/// # Returns
///
/// * `Ok(usize)` - Worker count to use; a single worker is raised to two on multi-core hosts
/// * `Err(ConfigError::WorkerCount)` - More than three workers per core were requested
pub fn resolve_worker_count(configured: usize, cores: usize) -> Result<usize, ConfigError> {
    let cores = cores.max(1);
    let limit = cores * WORKERS_PER_CORE;

    if configured > limit {
        return Err(ConfigError::WorkerCount {
            workers: configured,
            cores,
            limit,
        });
    }

    if configured == 1 && cores > 1 {
        return Ok(2);
    }

    Ok(configured)
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.workers < 1 {
        return Err(ConfigError::Validation(format!(
            "workers must be >= 1, got {}",
            config.workers
        )));
    }

    validate_recursion_level(config.recursion_level, "crawler")?;

    Ok(())
}

fn validate_recursion_level(level: u32, owner: &str) -> Result<(), ConfigError> {
    if level < 1 || level > MAX_RECURSION_LEVEL {
        return Err(ConfigError::Validation(format!(
            "{}: recursion-level must be between 1 and {}, got {}",
            owner, MAX_RECURSION_LEVEL, level
        )));
    }
    Ok(())
}

/// Validates network configuration
fn validate_network_config(config: &NetworkConfig) -> Result<(), ConfigError> {
    if config.retry_count < 1 {
        return Err(ConfigError::Validation(
            "retry-count must be >= 1".to_string(),
        ));
    }

    let timings = [
        ("retry-wait", config.retry_wait),
        ("min-jitter", config.min_jitter),
        ("max-jitter", config.max_jitter),
        ("connect-timeout", config.connect_timeout),
        ("read-timeout", config.read_timeout),
    ];
    for (name, value) in timings {
        if !value.is_finite() {
            return Err(ConfigError::Validation(format!(
                "{} must be a finite number of seconds, got {}",
                name, value
            )));
        }
    }

    if config.retry_wait < 0.0 || config.min_jitter < 0.0 {
        return Err(ConfigError::Validation(
            "retry-wait and min-jitter cannot be negative".to_string(),
        ));
    }

    if config.min_jitter > config.max_jitter {
        return Err(ConfigError::Validation(format!(
            "min-jitter ({}) cannot exceed max-jitter ({})",
            config.min_jitter, config.max_jitter
        )));
    }

    if config.connect_timeout <= 0.0 || config.read_timeout <= 0.0 {
        return Err(ConfigError::Validation(
            "connect-timeout and read-timeout must be positive".to_string(),
        ));
    }

    if config.user_agent_list().is_empty() {
        return Err(ConfigError::Validation(
            "user-agents must contain at least one entry".to_string(),
        ));
    }

    for proxy in &config.proxies {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    Ok(())
}

fn validate_history_config(config: &HistoryConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.data_dir.is_empty() {
        return Err(ConfigError::Validation(
            "data-dir cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates every source entry and the uniqueness of their names
fn validate_sources(sources: &[SourceConfig]) -> Result<(), ConfigError> {
    let mut names = HashSet::new();

    for source in sources {
        validate_source(source)?;

        if !names.insert(source.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate source name '{}'",
                source.name
            )));
        }
    }

    Ok(())
}

fn validate_source(source: &SourceConfig) -> Result<(), ConfigError> {
    if source.name.is_empty() {
        return Err(ConfigError::Validation(
            "Source name cannot be empty".to_string(),
        ));
    }

    if !source
        .name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "Source name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            source.name
        )));
    }

    if let Some(level) = source.recursion_level {
        validate_recursion_level(level, &source.name)?;
    }

    for domain in &source.allowed_domains {
        validate_domain_pattern(domain)?;
    }

    let urls = source
        .main_url
        .iter()
        .chain(&source.feeds)
        .chain(&source.non_content_urls);
    for raw in urls {
        validate_http_url(raw, &source.name)?;
    }

    // valid/invalid patterns are plain substrings; only id and date patterns are regexes
    let patterns = source
        .id_patterns
        .iter()
        .map(|p| &p.pattern)
        .chain(source.date_patterns.iter().map(|p| &p.pattern));
    for pattern in patterns {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!(
                "Source '{}' has invalid regex '{}': {}",
                source.name, pattern, e
            ))
        })?;
    }

    match source.kind {
        SourceKind::Aggregator if source.feeds.is_empty() => {
            return Err(ConfigError::Validation(format!(
                "Aggregator source '{}' must list at least one feed",
                source.name
            )));
        }
        SourceKind::Content | SourceKind::Api | SourceKind::Data
            if source.main_url.is_none() && source.feeds.is_empty() =>
        {
            return Err(ConfigError::Validation(format!(
                "Source '{}' needs a main-url or at least one feed",
                source.name
            )));
        }
        _ => {}
    }

    Ok(())
}

fn validate_http_url(raw: &str, source_name: &str) -> Result<(), ConfigError> {
    let url = Url::parse(raw).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Source '{}' has invalid URL '{}': {}",
            source_name, raw, e
        ))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "URL '{}' of source '{}' must use http or https",
            raw, source_name
        )));
    }

    Ok(())
}

/// Validates a domain pattern (supports wildcards)
fn validate_domain_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain pattern cannot be empty".to_string(),
        ));
    }

    // Check if it's a wildcard pattern
    if let Some(domain) = pattern.strip_prefix("*.") {
        validate_domain_string(domain)?;
    } else {
        validate_domain_string(pattern)?;
    }

    Ok(())
}

/// Validates a domain string (without wildcard prefix)
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    // localhost is accepted so sources can point at local mirrors
    if !domain.contains('.') && domain != "localhost" {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
