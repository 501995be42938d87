//! Gleaner: a resumable multi-source news crawler
//!
//! This crate discovers, fetches and deduplicates article URLs across many
//! independently configured sources. A crawl runs as three barrier-separated
//! phases (discovery, retrieval, processing) spread over a fixed pool of
//! workers, and every URL's progress is recorded in an SQLite session history
//! so an interrupted run resumes where it stopped.

pub mod config;
pub mod crawler;
pub mod output;
pub mod sources;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Gleaner operations
#[derive(Debug, Error)]
pub enum GleanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session history error: {0}")]
    History(#[from] storage::HistoryError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Task for {source_name} does not belong in a {worker_kind} worker")]
    TaskMismatch {
        source_name: String,
        worker_kind: crawler::TaskKind,
    },

    #[error("Invalid state transition for {source_name}: {from} -> {to}")]
    InvalidTransition {
        source_name: String,
        from: state::SourceState,
        to: state::SourceState,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GleanError {
    /// Process exit code for an error that ends the program
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(e) => e.exit_code(),
            Self::History(storage::HistoryError::UncleanShutdown { .. }) => 3,
            _ => 4,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("{workers} workers exceeds the limit of {limit} for {cores} available cores")]
    WorkerCount {
        workers: usize,
        cores: usize,
        limit: usize,
    },

    #[error("Unknown plugin '{plugin}' for source '{source_name}'")]
    UnknownPlugin { source_name: String, plugin: String },
}

impl ConfigError {
    /// Unreadable configuration exits with 1, invalid configuration with 2
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Io(_) | Self::Parse(_) => 1,
            _ => 2,
        }
    }
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Gleaner operations
pub type Result<T> = std::result::Result<T, GleanError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::QueueManager;
pub use sources::{FetchOutcome, FetchStatus};
pub use state::{SourceKind, SourceState};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_config_exit_codes() {
        let unreadable = ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        assert_eq!(unreadable.exit_code(), 1);
        assert_eq!(ConfigError::Validation("bad".to_string()).exit_code(), 2);

        let workers = ConfigError::WorkerCount {
            workers: 64,
            cores: 2,
            limit: 6,
        };
        assert_eq!(GleanError::from(workers).exit_code(), 2);
    }

    #[test]
    fn test_unclean_shutdown_exit_code() {
        let err = GleanError::History(storage::HistoryError::UncleanShutdown {
            path: PathBuf::from("history.db-journal"),
        });
        assert_eq!(err.exit_code(), 3);
        assert_eq!(GleanError::UnknownSource("x".to_string()).exit_code(), 4);
    }
}
