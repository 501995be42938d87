use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use gleaner::config::load_config;
///
/// let config = load_config(Path::new("gleaner.toml")).unwrap();
/// println!("{} sources configured", config.sources.len());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    // Read the configuration file
    let content = std::fs::read_to_string(path)?;

    // Parse TOML
    let config: Config = toml::from_str(&content)?;

    // Validate the configuration
    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so a run can be matched to the exact configuration it used.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok((Config, String))` - Successfully loaded configuration and its hash
/// * `Err(ConfigError)` - Failed to load or parse the configuration
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID_CONFIG: &str = r#"
[crawler]
workers = 2
recursion-level = 2
run-date = "2024-03-01"

[network]
retry-count = 2
user-agents = "AgentA/1.0 | AgentB/2.0"

[history]
database-path = "./history.db"

[output]
data-dir = "./data"

[[source]]
name = "wire"
main-url = "https://news.example.com/"
allowed-domains = ["news.example.com"]
invalid-patterns = ["/video/"]
id-patterns = [{ pattern = "/story/(\\d+)" }]

[[source]]
name = "digest"
kind = "aggregator"
plugin = "feed-aggregator"
feeds = ["https://digest.example.org/rss"]
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.workers, 2);
        assert_eq!(config.crawler.recursion_level, 2);
        assert_eq!(
            config.crawler.run_date,
            chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert_eq!(config.network.retry_count, 2);
        assert_eq!(
            config.network.user_agent_list(),
            vec!["AgentA/1.0".to_string(), "AgentB/2.0".to_string()]
        );
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].plugin, "generic-news");
        assert_eq!(config.sources[0].min_content_length, 400);
        assert_eq!(config.sources[0].id_patterns[0].group, 1);
        assert_eq!(config.sources[1].kind, crate::state::SourceKind::Aggregator);
    }

    #[test]
    fn test_network_defaults() {
        let config_content = r#"
[crawler]

[history]
database-path = "./history.db"

[output]
data-dir = "./data"
"#;
        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.workers, 4);
        assert_eq!(config.network.retry_count, 3);
        assert_eq!(config.network.user_agent_list().len(), 1);
        assert!(config.sources.is_empty());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/gleaner.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let config_content = "this is not valid TOML {{{";
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[crawler]
workers = 0

[history]
database-path = "./history.db"

[output]
data-dir = "./data"
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config(VALID_CONFIG);

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        // Same content should produce same hash
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA-256 produces 64 hex characters
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_config("content 1");
        let file2 = create_temp_config("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }
}
