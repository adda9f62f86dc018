//! Store module for the Matching Engine
//!
//! This module provides the log store trait and its implementations.

mod limits;
mod memory;
mod redis;
mod reply;
mod traits;

pub use limits::{MAX_BLOCK_MS, MAX_FIELDS, MAX_GROUP_READ_COUNT, MAX_TAIL_READ_COUNT};
pub use memory::InMemoryLogStore;
pub use self::redis::RedisLogStore;
pub use reply::{parse_integer_reply, parse_stream_read_reply};
pub use traits::*;

use std::sync::Arc;
use tracing::info;

/// Store type selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    /// In-memory store (fast, non-persistent)
    InMemory,
    /// Redis streams (persistent)
    Redis,
}

impl StoreType {
    /// Parse store type from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "inmemory" | "in_memory" | "memory" => Some(StoreType::InMemory),
            "redis" => Some(StoreType::Redis),
            _ => None,
        }
    }
}

/// Create a log store based on configuration
///
/// Each call opens a fresh connection for Redis, so callers that block on
/// reads should call this once per worker.
pub async fn create_log_store(
    store_type: StoreType,
    redis_config: &config::RedisConfig,
) -> StoreResult<Arc<dyn LogStore>> {
    match store_type {
        StoreType::InMemory => {
            info!("Creating in-memory log store");
            Ok(Arc::new(InMemoryLogStore::new()))
        }
        StoreType::Redis => {
            info!("Creating Redis log store");
            let store = RedisLogStore::connect(redis_config).await?;
            Ok(Arc::new(store))
        }
    }
}
