use crate::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<StreamexConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());

    parse_config(&content)
}

/// Parse configuration text after environment substitution
pub fn parse_config(content: &str) -> Result<StreamexConfig> {
    let substituted = substitution::substitute_env_vars(content)?;
    debug!("Environment variable substitution completed");

    let config: StreamexConfig = serde_yaml::from_str(&substituted)
        .with_context(|| "Failed to parse YAML configuration")?;

    info!(markets = config.engine.markets.len(), "Configuration loaded successfully");
    Ok(config)
}

#[instrument]
pub fn generate_default_config() -> StreamexConfig {
    StreamexConfig {
        engine: EngineConfig {
            namespace: default_namespace(),
            consumer_name: default_consumer_name(),
            read_count: default_read_count(),
            block_ms: default_block_ms(),
            markets: vec!["TATA-INR".to_string()],
        },
        store: StoreConfig {
            store_type: default_store_type(),
            redis: RedisConfig {
                host: "${REDIS_HOST}".to_string(),
                port: default_redis_port(),
                password: "${REDIS_PASSWORD}".to_string(),
                db_index: 0,
            },
        },
        logging: Some(LoggingConfig::default()),
        metrics: Some(MetricsConfig::default()),
    }
}

#[instrument]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &StreamexConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}
