//! In-memory log store implementation
//!
//! Mirrors the Redis stream semantics the runtime depends on: store-assigned
//! ids, consumer groups with a delivery cursor and a pending-entries list,
//! and blocking reads. Data is lost on restart.
//!
//! Published messages go to `broadcast` subscribers only and are not kept.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, Notify};
use tracing::debug;

use crate::codec::{FieldMap, StreamFields};
use crate::store::limits::{
    check_block_ms, check_count, flatten_fields, MAX_GROUP_READ_COUNT, MAX_TAIL_READ_COUNT,
};
use crate::store::traits::{
    GroupCursor, GroupRead, GroupStart, LogStore, StoreError, StoreResult, StreamRecord,
};

/// Stream id as `(millis, sequence)`; ordering matches Redis
type EntryId = (u64, u64);

fn parse_entry_id(id: &str) -> Option<EntryId> {
    match id.split_once('-') {
        Some((ms, seq)) => Some((ms.parse().ok()?, seq.parse().ok()?)),
        None => Some((id.parse().ok()?, 0)),
    }
}

/// Messages a slow subscriber may fall behind by before it starts losing them
const CHANNEL_CAPACITY: usize = 256;

fn format_entry_id(id: EntryId) -> String {
    format!("{}-{}", id.0, id.1)
}

#[derive(Debug, Default)]
struct Group {
    last_delivered: EntryId,
    /// Delivered but unacknowledged entries, by owning consumer
    pending: BTreeMap<EntryId, String>,
}

#[derive(Debug, Default)]
struct Stream {
    entries: BTreeMap<EntryId, FieldMap>,
    last_id: EntryId,
    groups: HashMap<String, Group>,
}

impl Stream {
    fn records_after(&self, after: EntryId, count: usize) -> Vec<StreamRecord> {
        use std::ops::Bound::{Excluded, Unbounded};

        self.entries
            .range((Excluded(after), Unbounded))
            .take(count)
            .map(|(id, fields)| StreamRecord {
                id: format_entry_id(*id),
                fields: fields.clone(),
            })
            .collect()
    }
}

#[derive(Debug, Default)]
struct Inner {
    streams: HashMap<String, Stream>,
    channels: HashMap<String, broadcast::Sender<String>>,
}

/// In-memory log store
///
/// This implementation keeps every stream in process memory. It is used
/// for tests and for single-process runs without Redis.
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    inner: Mutex<Inner>,
    appended: Notify,
}

impl InMemoryLogStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records in a stream
    pub async fn stream_len(&self, stream: &str) -> usize {
        let inner = self.inner.lock().await;
        inner.streams.get(stream).map_or(0, |s| s.entries.len())
    }

    /// Every record of a stream, oldest first
    pub async fn records(&self, stream: &str) -> Vec<StreamRecord> {
        let inner = self.inner.lock().await;
        inner
            .streams
            .get(stream)
            .map(|s| s.records_after((0, 0), usize::MAX))
            .unwrap_or_default()
    }

    /// Number of delivered-but-unacknowledged records in a group
    pub async fn pending_count(&self, stream: &str, group: &str) -> usize {
        let inner = self.inner.lock().await;
        inner
            .streams
            .get(stream)
            .and_then(|s| s.groups.get(group))
            .map_or(0, |g| g.pending.len())
    }

    /// Subscribe to messages published on a channel from now on
    pub async fn subscribe(&self, channel: &str) -> broadcast::Receiver<String> {
        let mut inner = self.inner.lock().await;
        inner
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Remove a record like `XDEL`
    ///
    /// Pending entries that point at it stay pending and are returned with
    /// no fields by a `Pending` group read.
    pub async fn delete(&self, stream: &str, id: &str) -> bool {
        let Some(id) = parse_entry_id(id) else {
            return false;
        };
        let mut inner = self.inner.lock().await;
        inner
            .streams
            .get_mut(stream)
            .is_some_and(|s| s.entries.remove(&id).is_some())
    }

    /// Wait for the next append, or until `block_ms` elapses.
    /// Returns false on timeout. A zero `block_ms` waits indefinitely.
    async fn wait_for_append(&self, notified: tokio::sync::futures::Notified<'_>, block_ms: u64) -> bool {
        if block_ms == 0 {
            notified.await;
            return true;
        }
        tokio::time::timeout(Duration::from_millis(block_ms), notified)
            .await
            .is_ok()
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn append(&self, stream: &str, fields: &StreamFields) -> StoreResult<String> {
        flatten_fields(fields)?;

        let id = {
            let mut inner = self.inner.lock().await;
            let state = inner.streams.entry(stream.to_string()).or_default();
            let id = (state.last_id.0 + 1, 0);
            state.last_id = id;
            state
                .entries
                .insert(id, fields.iter().cloned().collect::<FieldMap>());
            id
        };

        self.appended.notify_waiters();
        Ok(format_entry_id(id))
    }

    async fn ensure_consumer_group(
        &self,
        stream: &str,
        group: &str,
        start: GroupStart,
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        let state = inner.streams.entry(stream.to_string()).or_default();
        if state.groups.contains_key(group) {
            debug!(stream = %stream, group = %group, "Consumer group already exists");
            return Ok(());
        }

        let last_delivered = match start {
            GroupStart::Beginning => (0, 0),
            GroupStart::Tail => state.last_id,
        };
        state.groups.insert(
            group.to_string(),
            Group {
                last_delivered,
                pending: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn ack(&self, stream: &str, group: &str, id: &str) -> StoreResult<u64> {
        let Some(id) = parse_entry_id(id) else {
            return Ok(0);
        };

        let mut inner = self.inner.lock().await;
        let acked = inner
            .streams
            .get_mut(stream)
            .and_then(|s| s.groups.get_mut(group))
            .map_or(0, |g| u64::from(g.pending.remove(&id).is_some()));
        Ok(acked)
    }

    async fn read_group(&self, read: GroupRead<'_>) -> StoreResult<Vec<StreamRecord>> {
        let count = check_count(read.count, MAX_GROUP_READ_COUNT)?;
        let block_ms = check_block_ms(read.block_ms)?;

        loop {
            let notified = self.appended.notified();
            {
                let mut inner = self.inner.lock().await;
                let state = inner.streams.get_mut(read.stream);
                let Some(state) = state.filter(|s| s.groups.contains_key(read.group)) else {
                    return Err(StoreError::UnknownGroup {
                        stream: read.stream.to_string(),
                        group: read.group.to_string(),
                    });
                };

                match read.cursor {
                    GroupCursor::Pending => {
                        let group = &state.groups[read.group];
                        let records = group
                            .pending
                            .iter()
                            .filter(|(_, owner)| owner.as_str() == read.consumer)
                            .take(count)
                            .map(|(id, _)| StreamRecord {
                                id: format_entry_id(*id),
                                fields: state.entries.get(id).cloned().unwrap_or_default(),
                            })
                            .collect();
                        return Ok(records);
                    }
                    GroupCursor::New => {
                        let after = state.groups[read.group].last_delivered;
                        let records = state.records_after(after, count);
                        if !records.is_empty() {
                            if let Some(group) = state.groups.get_mut(read.group) {
                                for record in &records {
                                    if let Some(id) = parse_entry_id(&record.id) {
                                        group.last_delivered = id;
                                        group.pending.insert(id, read.consumer.to_string());
                                    }
                                }
                            }
                            return Ok(records);
                        }
                    }
                }
            }

            if !self.wait_for_append(notified, block_ms).await {
                return Ok(Vec::new());
            }
        }
    }

    async fn read_since(
        &self,
        stream: &str,
        after_id: &str,
        count: usize,
        block_ms: u64,
    ) -> StoreResult<Vec<StreamRecord>> {
        let count = check_count(count, MAX_TAIL_READ_COUNT)?;
        let block_ms = check_block_ms(block_ms)?;

        let mut after = if after_id == "$" {
            None
        } else {
            Some(parse_entry_id(after_id).ok_or_else(|| StoreError::InvalidArgument {
                name: "after_id",
                reason: format!("{after_id:?} is not a stream id"),
            })?)
        };

        loop {
            let notified = self.appended.notified();
            {
                let inner = self.inner.lock().await;
                let state = inner.streams.get(stream);
                let from = *after.get_or_insert_with(|| state.map_or((0, 0), |s| s.last_id));
                let records = state.map(|s| s.records_after(from, count)).unwrap_or_default();
                if !records.is_empty() {
                    return Ok(records);
                }
            }

            if !self.wait_for_append(notified, block_ms).await {
                return Ok(Vec::new());
            }
        }
    }

    async fn last_entry_id(&self, stream: &str) -> StoreResult<Option<String>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .streams
            .get(stream)
            .and_then(|s| s.entries.last_key_value())
            .map(|(id, _)| format_entry_id(*id)))
    }

    async fn publish(&self, channel: &str, message: &str) -> StoreResult<u64> {
        let mut inner = self.inner.lock().await;
        let Some(sender) = inner.channels.get(channel) else {
            return Ok(0);
        };
        match sender.send(message.to_string()) {
            Ok(receivers) => Ok(receivers as u64),
            Err(_) => {
                // Every subscriber is gone
                inner.channels.remove(channel);
                Ok(0)
            }
        }
    }
}
