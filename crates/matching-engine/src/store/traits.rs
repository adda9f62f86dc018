//! Log store trait for the Matching Engine
//!
//! This module defines the append-only stream primitives that every log
//! store implementation must provide.

use async_trait::async_trait;

use crate::codec::{FieldMap, StreamFields};

/// Errors that can occur in the store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Invalid argument {name}: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("Invalid fields: {0}")]
    InvalidFields(&'static str),

    #[error("Invalid reply: {0}")]
    InvalidReply(String),

    #[error("Unknown consumer group {group} on stream {stream}")]
    UnknownGroup { stream: String, group: String },

    #[error("Store error: {0}")]
    Other(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One record read back from a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRecord {
    /// Store-assigned id, totally ordered within the stream
    pub id: String,
    pub fields: FieldMap,
}

/// Where a newly created consumer group starts reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupStart {
    /// Every record already in the stream (`0-0`)
    Beginning,
    /// Only records appended after creation (`$`)
    Tail,
}

impl GroupStart {
    pub fn as_id(&self) -> &'static str {
        match self {
            GroupStart::Beginning => "0-0",
            GroupStart::Tail => "$",
        }
    }
}

/// Which records a group read returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupCursor {
    /// Records already delivered to this consumer but not yet acknowledged
    Pending,
    /// Records never delivered to any consumer of the group
    New,
}

impl GroupCursor {
    pub fn as_id(&self) -> &'static str {
        match self {
            GroupCursor::Pending => "0",
            GroupCursor::New => ">",
        }
    }
}

/// Arguments of a consumer-group read
#[derive(Debug, Clone)]
pub struct GroupRead<'a> {
    pub stream: &'a str,
    pub group: &'a str,
    pub consumer: &'a str,
    pub cursor: GroupCursor,
    pub count: usize,
    pub block_ms: u64,
}

/// Trait for the append-only log backing commands and events
///
/// Implementations can be in-memory or Redis streams.
#[async_trait]
pub trait LogStore: Send + Sync {
    // ------------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------------

    /// Append a record and return its store-assigned id
    async fn append(&self, stream: &str, fields: &StreamFields) -> StoreResult<String>;

    /// Create a consumer group (and the stream) if it does not exist yet
    async fn ensure_consumer_group(
        &self,
        stream: &str,
        group: &str,
        start: GroupStart,
    ) -> StoreResult<()>;

    /// Acknowledge a delivered record, returning how many were acknowledged
    async fn ack(&self, stream: &str, group: &str, id: &str) -> StoreResult<u64>;

    // ------------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------------

    /// Read through a consumer group, blocking up to `block_ms` for new records
    async fn read_group(&self, read: GroupRead<'_>) -> StoreResult<Vec<StreamRecord>>;

    /// Read records strictly after `after_id` without a group
    async fn read_since(
        &self,
        stream: &str,
        after_id: &str,
        count: usize,
        block_ms: u64,
    ) -> StoreResult<Vec<StreamRecord>>;

    /// Id of the newest record, `None` for a missing or empty stream
    ///
    /// Readers that start "from now" resolve their cursor with this once,
    /// since `$` re-resolves on every read.
    async fn last_entry_id(&self, stream: &str) -> StoreResult<Option<String>>;

    // ------------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------------

    /// Publish a message on a channel, returning the number of receivers
    async fn publish(&self, channel: &str, message: &str) -> StoreResult<u64>;
}
