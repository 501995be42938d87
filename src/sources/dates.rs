//! Publish-date recovery from raw documents
//!
//! When the article extractor finds no publish date, an ordered cascade of
//! regular expressions is run against the raw document. Each pattern carries
//! its own format spec. The first match that parses to a date not in the
//! future wins.

use crate::config::DatePatternConfig;
use crate::ConfigError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

/// How a captured date string is parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateFormat {
    Rfc2822,
    Rfc3339,
    /// A chrono strftime string
    Pattern(String),
}

impl DateFormat {
    pub fn from_spec(spec: &str) -> Self {
        match spec.trim().to_ascii_lowercase().as_str() {
            "rfc2822" => Self::Rfc2822,
            "rfc3339" | "iso8601" => Self::Rfc3339,
            _ => Self::Pattern(spec.to_string()),
        }
    }

    /// Parses a captured string
    ///
    /// Formats without an offset are read as UTC, date-only formats as midnight UTC.
    pub fn parse(&self, raw: &str) -> Option<DateTime<FixedOffset>> {
        let raw = raw.trim();
        match self {
            Self::Rfc2822 => DateTime::parse_from_rfc2822(raw).ok(),
            Self::Rfc3339 => DateTime::parse_from_rfc3339(raw)
                .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
                .ok()
                .or_else(|| Self::Pattern("%Y-%m-%dT%H:%M:%S%.f".to_string()).parse(raw))
                .or_else(|| Self::Pattern("%Y-%m-%d".to_string()).parse(raw)),
            Self::Pattern(format) => DateTime::parse_from_str(raw, format)
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(raw, format)
                        .ok()
                        .map(|naive| naive.and_utc().fixed_offset())
                })
                .or_else(|| {
                    NaiveDate::parse_from_str(raw, format)
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                        .map(|naive| naive.and_utc().fixed_offset())
                }),
        }
    }
}

/// One entry of the cascade
#[derive(Debug, Clone)]
pub struct DatePattern {
    regex: Regex,
    group: usize,
    format: DateFormat,
}

impl DatePattern {
    pub fn new(pattern: &str, group: usize, format: DateFormat) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            group,
            format,
        })
    }
}

/// Ordered list of date patterns owned by one source
#[derive(Debug, Clone)]
pub struct DateCascade {
    patterns: Vec<DatePattern>,
}

impl DateCascade {
    /// Compiles a source's configured patterns, or the built-in cascade when none are set
    pub fn from_config(configs: &[DatePatternConfig]) -> Result<Self, ConfigError> {
        if configs.is_empty() {
            return Ok(Self::default_cascade());
        }

        let patterns = configs
            .iter()
            .map(|c| {
                let format = DateFormat::from_spec(&c.format);
                DatePattern::new(&c.pattern, c.group, format).map_err(|e| {
                    ConfigError::InvalidPattern(format!("date pattern '{}': {}", c.pattern, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Common metadata locations for a publish date
    pub fn default_cascade() -> Self {
        let defaults = [
            (
                r#"(?i)<meta[^>]+property=["']article:published_time["'][^>]*content=["']([^"']+)["']"#,
                DateFormat::Rfc3339,
            ),
            (
                r#"(?i)<meta[^>]+content=["']([^"']+)["'][^>]*property=["']article:published_time["']"#,
                DateFormat::Rfc3339,
            ),
            (
                r#"(?i)<meta[^>]+name=["']publish-date["'][^>]*content=["']([^"']+)["']"#,
                DateFormat::Rfc2822,
            ),
            (r#""datePublished"\s*:\s*"([^"]+)""#, DateFormat::Rfc3339),
            (
                r#"(?i)<time[^>]+datetime=["']([^"']+)["']"#,
                DateFormat::Rfc3339,
            ),
        ];

        let patterns = defaults
            .into_iter()
            .filter_map(|(pattern, format)| DatePattern::new(pattern, 1, format).ok())
            .collect();

        Self { patterns }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Scans `raw` with each pattern in order
    ///
    /// Every match of a pattern is tried before moving to the next pattern.
    /// Matches that fail to parse or lie after `now` are skipped.
    pub fn find_publish_date(
        &self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Option<DateTime<FixedOffset>> {
        for pattern in &self.patterns {
            for captures in pattern.regex.captures_iter(raw) {
                let Some(found) = captures.get(pattern.group) else {
                    continue;
                };

                match pattern.format.parse(found.as_str()) {
                    Some(date) if date.with_timezone(&Utc) <= now => return Some(date),
                    Some(date) => {
                        tracing::debug!("Skipping future publish date {}", date);
                    }
                    None => {}
                }
            }
        }
        None
    }
}
