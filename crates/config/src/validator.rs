use crate::*;
use std::collections::HashSet;
use thiserror::Error;

const STORE_TYPES: [&str; 4] = ["redis", "memory", "inmemory", "in_memory"];
const LOG_FORMATS: [&str; 3] = ["pretty", "json", "compact"];
const MAX_READ_COUNT: usize = 1000;
const MAX_BLOCK_MS: u64 = 60_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("engine.namespace must be non-empty and contain no ':' or whitespace, got: {0:?}")]
    InvalidNamespace(String),

    #[error("engine.consumer_name is required")]
    MissingConsumerName,

    #[error("engine.markets must list at least one market")]
    NoMarkets,

    #[error("Market {market:?}: {message}")]
    InvalidMarket { market: String, message: String },

    #[error("engine.read_count must be between 1 and {max}, got: {value}")]
    InvalidReadCount { value: usize, max: usize },

    #[error("engine.block_ms must be at most {max}, got: {value}")]
    InvalidBlockMs { value: u64, max: u64 },

    #[error("Invalid store type: {0}. Must be one of: redis, memory")]
    InvalidStoreType(String),

    #[error("Redis: {message}")]
    InvalidRedis { message: String },

    #[error("Invalid log format: {0}. Must be one of: pretty, json, compact")]
    InvalidLogFormat(String),

    #[error("metrics.port must be non-zero when metrics are enabled")]
    InvalidMetricsPort,

    #[error("Environment variable '{var}' is missing or invalid: {message}")]
    InvalidEnvVar { var: String, message: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_default(&mut self, field: &str, value: &str) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

pub fn validate_config(config: &StreamexConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_engine(&config.engine, &mut report);
    validate_store(&config.store, &mut report);

    match &config.logging {
        Some(logging) => validate_logging(logging, &mut report),
        None => {
            let logging = LoggingConfig::default();
            report.add_default("logging.format", &logging.format);
            report.add_default("logging.level", &logging.level);
        }
    }

    match &config.metrics {
        Some(metrics) => {
            if metrics.enabled && metrics.port == 0 {
                report.add_error(ValidationError::InvalidMetricsPort);
            }
        }
        None => report.add_default("metrics.enabled", "false"),
    }

    report
}

fn is_key_segment(value: &str) -> bool {
    !value.is_empty() && !value.contains(':') && !value.chars().any(char::is_whitespace)
}

fn validate_engine(engine: &EngineConfig, report: &mut ValidationReport) {
    if !is_key_segment(&engine.namespace) {
        report.add_error(ValidationError::InvalidNamespace(engine.namespace.clone()));
    }

    if engine.consumer_name.trim().is_empty() {
        report.add_error(ValidationError::MissingConsumerName);
    } else if engine.consumer_name == default_consumer_name() {
        report.add_warning(
            "engine.consumer_name",
            "Using the default consumer name; give each engine process a stable unique name",
        );
    }

    if engine.read_count == 0 || engine.read_count > MAX_READ_COUNT {
        report.add_error(ValidationError::InvalidReadCount {
            value: engine.read_count,
            max: MAX_READ_COUNT,
        });
    }

    if engine.block_ms > MAX_BLOCK_MS {
        report.add_error(ValidationError::InvalidBlockMs {
            value: engine.block_ms,
            max: MAX_BLOCK_MS,
        });
    } else if engine.block_ms == 0 {
        report.add_warning(
            "engine.block_ms",
            "0 blocks indefinitely; shutdown is only observed after the next command arrives",
        );
    }

    if engine.markets.is_empty() {
        report.add_error(ValidationError::NoMarkets);
        return;
    }

    let mut seen = HashSet::new();
    for market in &engine.markets {
        if !is_key_segment(market) {
            report.add_error(ValidationError::InvalidMarket {
                market: market.clone(),
                message: "must be non-empty and contain no ':' or whitespace".to_string(),
            });
        }
        if !seen.insert(market.as_str()) {
            report.add_error(ValidationError::InvalidMarket {
                market: market.clone(),
                message: "listed more than once".to_string(),
            });
        }
    }
}

fn validate_store(store: &StoreConfig, report: &mut ValidationReport) {
    let store_type = store.store_type.to_lowercase();
    if !STORE_TYPES.contains(&store_type.as_str()) {
        report.add_error(ValidationError::InvalidStoreType(store.store_type.clone()));
        return;
    }

    if store_type != "redis" {
        report.add_warning(
            "store.type",
            "In-memory store is not durable; commands and events are lost on exit",
        );
        return;
    }

    let redis = &store.redis;
    if redis.host.is_empty() {
        report.add_error(ValidationError::InvalidRedis {
            message: "host is required".to_string(),
        });
    }
    if redis.port == 0 {
        report.add_error(ValidationError::InvalidRedis {
            message: "port must be non-zero".to_string(),
        });
    }

    for (field, value) in [("store.redis.host", &redis.host), ("store.redis.password", &redis.password)] {
        if has_unresolved_env_vars(value) {
            report.add_error(ValidationError::InvalidEnvVar {
                var: value.clone(),
                message: format!("{} references an unset environment variable", field),
            });
        }
    }
}

fn validate_logging(logging: &LoggingConfig, report: &mut ValidationReport) {
    if !LOG_FORMATS.contains(&logging.format.to_lowercase().as_str()) {
        report.add_error(ValidationError::InvalidLogFormat(logging.format.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> StreamexConfig {
        let mut config = generate_default_config();
        config.engine.consumer_name = "engine-a".to_string();
        config.store.redis.host = "localhost".to_string();
        config.store.redis.password = String::new();
        config
    }

    #[test]
    fn test_valid_config() {
        let report = validate_config(&valid_config());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
        assert!(report.defaults_applied.is_empty());
    }

    #[test]
    fn test_default_config_flags_unset_env_vars() {
        let report = validate_config(&generate_default_config());
        assert_eq!(
            report
                .errors
                .iter()
                .filter(|e| matches!(e, ValidationError::InvalidEnvVar { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_engine_errors() {
        let mut config = valid_config();
        config.engine.namespace = "a:b".to_string();
        config.engine.read_count = 0;
        config.engine.block_ms = 60_001;
        config.engine.markets = vec!["X".to_string(), "X".to_string(), "".to_string()];

        let errors = validate_config(&config).errors;
        assert!(errors.contains(&ValidationError::InvalidNamespace("a:b".to_string())));
        assert!(errors.contains(&ValidationError::InvalidReadCount { value: 0, max: 1000 }));
        assert!(errors.contains(&ValidationError::InvalidBlockMs { value: 60_001, max: 60_000 }));
        assert_eq!(
            errors
                .iter()
                .filter(|e| matches!(e, ValidationError::InvalidMarket { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn test_no_markets() {
        let mut config = valid_config();
        config.engine.markets.clear();
        assert!(validate_config(&config).errors.contains(&ValidationError::NoMarkets));
    }

    #[test]
    fn test_memory_store_warns_and_skips_redis_checks() {
        let mut config = valid_config();
        config.store.store_type = "memory".to_string();
        config.store.redis.host = String::new();

        let report = validate_config(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].field, "store.type");
    }

    #[test]
    fn test_invalid_store_and_log_format() {
        let mut config = valid_config();
        config.store.store_type = "kafka".to_string();
        config.logging = Some(LoggingConfig {
            format: "xml".to_string(),
            level: "info".to_string(),
        });

        let errors = validate_config(&config).errors;
        assert!(errors.contains(&ValidationError::InvalidStoreType("kafka".to_string())));
        assert!(errors.contains(&ValidationError::InvalidLogFormat("xml".to_string())));
    }

    #[test]
    fn test_defaults_reported_for_missing_sections() {
        let mut config = valid_config();
        config.logging = None;
        config.metrics = None;

        let report = validate_config(&config);
        let fields: Vec<_> = report.defaults_applied.iter().map(|d| d.field.as_str()).collect();
        assert_eq!(fields, vec!["logging.format", "logging.level", "metrics.enabled"]);
    }

    #[test]
    fn test_zero_block_warns() {
        let mut config = valid_config();
        config.engine.block_ms = 0;
        let report = validate_config(&config);
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.field == "engine.block_ms"));
    }
}
