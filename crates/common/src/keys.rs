//! Stream and channel naming
//!
//! Every market owns two streams under a namespace prefix:
//!
//! - `<ns>:cmd:<market>` - command log, consumed by the engine group
//! - `<ns>:evt:<market>` - event log, appended by the engine
//!
//! plus the consumer group `engine:<market>` and the notification channel
//! `evtPing:<market>`.

/// Namespace used when none is configured
pub const DEFAULT_NAMESPACE: &str = "streamex";

/// Keys for a single market
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamKeys {
    pub market: String,
    pub command_stream: String,
    pub event_stream: String,
    pub group: String,
    pub notify_channel: String,
}

impl StreamKeys {
    pub fn new(namespace: &str, market: &str) -> Self {
        Self {
            market: market.to_string(),
            command_stream: command_stream(namespace, market),
            event_stream: event_stream(namespace, market),
            group: engine_group(market),
            notify_channel: notify_channel(market),
        }
    }
}

pub fn command_stream(namespace: &str, market: &str) -> String {
    format!("{}:cmd:{}", namespace, market)
}

pub fn event_stream(namespace: &str, market: &str) -> String {
    format!("{}:evt:{}", namespace, market)
}

pub fn engine_group(market: &str) -> String {
    format!("engine:{}", market)
}

pub fn notify_channel(market: &str) -> String {
    format!("evtPing:{}", market)
}
