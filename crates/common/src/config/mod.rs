//! Configuration management for CiteForge
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Bibliographic service configuration
    #[serde(default)]
    pub scholar: ScholarConfig,

    /// Traversal bounds
    #[serde(default)]
    pub traversal: TraversalConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Bibliographic service connection and pacing
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[validate(schema(function = "validate_backoff"))]
pub struct ScholarConfig {
    /// API base URL (Graph API v1 root)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Optional API key, sent as `x-api-key`
    pub api_key: Option<String>,

    /// Minimum spacing between two requests in milliseconds
    #[serde(default = "default_min_interval")]
    pub min_interval_ms: u64,

    /// Wait before the single retry after a 429, in milliseconds
    #[serde(default = "default_rate_limit_backoff")]
    pub rate_limit_backoff_ms: u64,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

/// Bounds applied to one network build
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct TraversalConfig {
    /// Number of hops expanded from the center paper
    #[serde(default = "default_max_depth")]
    #[validate(range(max = 10))]
    pub max_depth: usize,

    /// Maximum papers requested per direction per expanded node
    #[serde(default = "default_max_per_level")]
    #[validate(range(min = 1, max = 1000))]
    pub max_per_level: usize,

    /// Hard cap on the number of nodes in the graph
    #[serde(default = "default_node_cap")]
    #[validate(range(min = 1))]
    pub node_cap: usize,

    /// Optional wall-clock budget for the whole traversal
    pub max_duration_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,
}

/// The rate-limit backoff has to outlast the regular spacing
fn validate_backoff(config: &ScholarConfig) -> Result<(), ValidationError> {
    if config.rate_limit_backoff_ms <= config.min_interval_ms {
        let mut err = ValidationError::new("backoff_not_above_interval");
        err.message = Some("rate_limit_backoff_ms must exceed min_interval_ms".into());
        return Err(err);
    }
    Ok(())
}

// Default value functions
fn default_base_url() -> String { "https://api.semanticscholar.org/graph/v1".to_string() }
fn default_min_interval() -> u64 { 500 }
fn default_rate_limit_backoff() -> u64 { 5000 }
fn default_timeout() -> u64 { 30 }
fn default_max_depth() -> usize { 2 }
fn default_max_per_level() -> usize { 20 }
fn default_node_cap() -> usize { 500 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }

impl Default for ScholarConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            min_interval_ms: default_min_interval(),
            rate_limit_backoff_ms: default_rate_limit_backoff(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_per_level: default_max_per_level(),
            node_cap: default_node_cap(),
            max_duration_secs: None,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
        }
    }
}

impl ScholarConfig {
    /// Minimum request spacing as Duration
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Rate-limit backoff as Duration
    pub fn rate_limit_backoff(&self) -> Duration {
        Duration::from_millis(self.rate_limit_backoff_ms)
    }

    /// Request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl TraversalConfig {
    /// Traversal wall-clock budget, if any
    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_secs.map(Duration::from_secs)
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__TRAVERSAL__MAX_DEPTH=3
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scholar: ScholarConfig::default(),
            traversal: TraversalConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.scholar.min_interval(), Duration::from_millis(500));
        assert!(config.scholar.rate_limit_backoff() > config.scholar.min_interval());
        assert_eq!(config.traversal.max_depth, 2);
        assert_eq!(config.traversal.max_per_level, 20);
        assert!(config.traversal.validate().is_ok());
    }

    #[test]
    fn test_traversal_validation() {
        let config = TraversalConfig {
            max_per_level: 0,
            ..TraversalConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TraversalConfig {
            node_cap: 0,
            ..TraversalConfig::default()
        };
        assert!(config.validate().is_err());

        let config = TraversalConfig {
            max_depth: 0,
            ..TraversalConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scholar_validation() {
        assert!(ScholarConfig::default().validate().is_ok());

        let config = ScholarConfig {
            min_interval_ms: 2000,
            rate_limit_backoff_ms: 1000,
            ..ScholarConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ScholarConfig {
            timeout_secs: 0,
            ..ScholarConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = Config::builder()
            .add_source(config::File::from_str(
                "[traversal]\nmax_depth = 1\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.traversal.max_depth, 1);
        assert_eq!(config.traversal.node_cap, 500);
        assert_eq!(config.scholar.timeout(), Duration::from_secs(30));
    }
}
