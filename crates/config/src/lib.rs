//! Configuration for the streamex engine
//!
//! The engine is configured from a single YAML file. `${VAR}` and `$VAR`
//! references are substituted from the environment before parsing, and
//! [`validate_config`] produces a report of errors, warnings and defaults.

use serde::{Deserialize, Serialize};

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

/// Top-level configuration file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamexConfig {
    pub engine: EngineConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

impl StreamexConfig {
    /// Logging settings, falling back to defaults when the section is absent
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Metrics settings, falling back to defaults when the section is absent
    pub fn metrics(&self) -> MetricsConfig {
        self.metrics.clone().unwrap_or_default()
    }
}

// ============================================================================
// Engine
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Prefix of every stream key
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Consumer name inside each market's group; must be stable across
    /// restarts so pending commands are redelivered to the same consumer
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,
    /// Command records requested per read
    #[serde(default = "default_read_count")]
    pub read_count: usize,
    /// How long a read blocks waiting for commands
    #[serde(default = "default_block_ms")]
    pub block_ms: u64,
    /// Markets served by this process, one worker each
    pub markets: Vec<String>,
}

// ============================================================================
// Store
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// `redis` or `memory`
    #[serde(rename = "type", default = "default_store_type")]
    pub store_type: String,
    #[serde(default)]
    pub redis: RedisConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_type: default_store_type(),
            redis: RedisConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_host")]
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub db_index: u8,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
            password: String::new(),
            db_index: 0,
        }
    }
}

impl RedisConfig {
    /// `redis://[:password@]host:port/db`, with the password percent-encoded
    pub fn connection_url(&self) -> Result<String, url::ParseError> {
        let mut url = url::Url::parse(&format!(
            "redis://{}:{}/{}",
            self.host, self.port, self.db_index
        ))?;
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| url::ParseError::EmptyHost)?;
        }
        Ok(url.to_string())
    }
}

// ============================================================================
// Logging & Metrics
// ============================================================================

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `pretty`, `json` or `compact`
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sample_config() {
        let yaml = include_str!("../../../deploy/streamex.yaml");
        let config: StreamexConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.engine.namespace, "streamex");
        assert_eq!(config.engine.markets, vec!["TATA-INR", "INFY-INR"]);
        assert_eq!(config.engine.read_count, 10);
        assert_eq!(config.engine.block_ms, 2000);
        assert_eq!(config.store.store_type, "redis");
        assert_eq!(config.store.redis.port, 6379);
        assert_eq!(config.logging().format, "json");
        assert!(config.metrics().enabled);
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let yaml = "engine:\n  markets: [TATA-INR]\n";
        let config: StreamexConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.engine.namespace, "streamex");
        assert_eq!(config.engine.consumer_name, "engine-1");
        assert_eq!(config.store.store_type, "redis");
        assert_eq!(config.store.redis.host, "127.0.0.1");
        assert!(config.logging.is_none());
        assert_eq!(config.logging().format, "pretty");
        assert!(!config.metrics().enabled);
    }

    #[test]
    fn test_markets_required() {
        let yaml = "engine:\n  namespace: x\n";
        assert!(serde_yaml::from_str::<StreamexConfig>(yaml).is_err());
    }

    #[test]
    fn test_connection_url() {
        let mut redis = RedisConfig::default();
        assert_eq!(redis.connection_url().unwrap(), "redis://127.0.0.1:6379/0");

        redis.password = "p@ss word".to_string();
        redis.db_index = 2;
        assert_eq!(
            redis.connection_url().unwrap(),
            "redis://:p%40ss%20word@127.0.0.1:6379/2"
        );
    }
}
