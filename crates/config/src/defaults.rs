use common::DEFAULT_NAMESPACE;

pub fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

pub fn default_consumer_name() -> String {
    "engine-1".to_string()
}

pub fn default_read_count() -> usize {
    10
}

pub fn default_block_ms() -> u64 {
    2000
}

pub fn default_store_type() -> String {
    "redis".to_string()
}

pub fn default_redis_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_redis_port() -> u16 {
    6379
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_metrics_port() -> u16 {
    9090
}
