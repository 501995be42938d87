//! Configuration module for Gleaner
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use gleaner::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("gleaner.toml")).unwrap();
//! println!("Crawl will use {} workers", config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, DatePatternConfig, HistoryConfig, IdPatternConfig, NetworkConfig,
    OutputConfig, SourceConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

pub use validation::{resolve_worker_count, MAX_RECURSION_LEVEL, WORKERS_PER_CORE};
