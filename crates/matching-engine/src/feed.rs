//! Read side of a market's event log
//!
//! A [`MarketFeed`] follows `<ns>:evt:<market>` from a cursor. Each record
//! is decoded with the store id injected as `eventId`; records that fail to
//! decode are logged and skipped so one bad entry cannot stall a reader.

use std::sync::Arc;

use futures::stream::{self, Stream, StreamExt};
use tracing::{debug, warn};

use common::StreamKeys;

use crate::codec::decode_event;
use crate::event::EventEnvelope;
use crate::store::{LogStore, StoreResult, MAX_TAIL_READ_COUNT};

/// Cursor meaning "only records appended from now on"
///
/// Resolved to the stream's newest id before the first read and never sent
/// to the store, so records appended between two reads are not skipped.
pub const FEED_FROM_NOW: &str = "$";
/// Cursor meaning "every record in the stream"
pub const FEED_FROM_START: &str = "0-0";

/// Tails the event stream of one market
pub struct MarketFeed {
    store: Arc<dyn LogStore>,
    market: String,
    stream: String,
    cursor: String,
    count: usize,
    block_ms: u64,
}

impl MarketFeed {
    pub fn new(keys: &StreamKeys, store: Arc<dyn LogStore>, from: impl Into<String>) -> Self {
        Self {
            store,
            market: keys.market.clone(),
            stream: keys.event_stream.clone(),
            cursor: from.into(),
            count: 100,
            block_ms: 2000,
        }
    }

    /// Records per read, capped at the tail read limit
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count.clamp(1, MAX_TAIL_READ_COUNT);
        self
    }

    pub fn with_block_ms(mut self, block_ms: u64) -> Self {
        self.block_ms = block_ms;
        self
    }

    pub fn market(&self) -> &str {
        &self.market
    }

    /// Id of the last record seen, or the starting cursor
    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    /// Read the next batch of events after the cursor
    ///
    /// Returns an empty batch when the block timeout elapses. The cursor
    /// moves past undecodable records too.
    pub async fn next_batch(&mut self) -> StoreResult<Vec<EventEnvelope>> {
        if self.cursor == FEED_FROM_NOW {
            self.cursor = self
                .store
                .last_entry_id(&self.stream)
                .await?
                .unwrap_or_else(|| FEED_FROM_START.to_string());
            debug!(market = %self.market, cursor = %self.cursor, "Resolved feed start");
        }

        let records = self
            .store
            .read_since(&self.stream, &self.cursor, self.count, self.block_ms)
            .await?;

        let mut events = Vec::with_capacity(records.len());
        for mut record in records {
            record
                .fields
                .insert("eventId".to_string(), record.id.clone());

            match decode_event(&record.fields) {
                Ok(event) => events.push(event),
                Err(e) => {
                    warn!(market = %self.market, id = %record.id, error = %e, "Skipping undecodable event");
                }
            }
            self.cursor = record.id;
        }

        if !events.is_empty() {
            debug!(market = %self.market, count = events.len(), cursor = %self.cursor, "Read events");
        }
        Ok(events)
    }

    /// Turn the feed into a stream of events
    ///
    /// The stream ends after the first store error, which is yielded.
    pub fn into_stream(self) -> impl Stream<Item = StoreResult<EventEnvelope>> {
        stream::unfold(Some(self), |feed| async move {
            let mut feed = feed?;
            loop {
                match feed.next_batch().await {
                    Ok(events) if events.is_empty() => continue,
                    Ok(events) => {
                        let items: Vec<StoreResult<EventEnvelope>> =
                            events.into_iter().map(Ok).collect();
                        return Some((stream::iter(items), Some(feed)));
                    }
                    Err(e) => return Some((stream::iter(vec![Err(e)]), None)),
                }
            }
        })
        .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_event;
    use crate::domain::{BookDelta, Side};
    use crate::error::RejectReason;
    use crate::command::CommandKind;
    use crate::event::{EventBody, EventKind};
    use crate::store::{InMemoryLogStore, StoreError};
    use assert_matches::assert_matches;

    fn keys() -> StreamKeys {
        StreamKeys::new("test", "TATA-INR")
    }

    fn add(order_id: &str, seq: u128) -> EventEnvelope {
        EventEnvelope::book_delta(
            "TATA-INR",
            seq,
            BookDelta::Add {
                order_id: order_id.to_string(),
                side: Side::Buy,
                price: 100,
                qty: 1,
            },
        )
        .with_command_id(format!("cmd-{order_id}"))
    }

    async fn seed(store: &InMemoryLogStore, events: &[EventEnvelope]) {
        for event in events {
            store
                .append(&keys().event_stream, &encode_event(event))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_reads_from_start_with_event_ids() {
        let store = Arc::new(InMemoryLogStore::new());
        seed(&store, &[add("b1", 1), add("b2", 2)]).await;

        let mut feed = MarketFeed::new(&keys(), store.clone(), FEED_FROM_START).with_block_ms(10);
        let events = feed.next_batch().await.unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_id.as_deref(), Some("1-0"));
        assert_eq!(events[1].book_seq(), Some(2));
        assert_eq!(feed.cursor(), "2-0");

        // Nothing new: timeout yields an empty batch and keeps the cursor
        assert!(feed.next_batch().await.unwrap().is_empty());
        assert_eq!(feed.cursor(), "2-0");
    }

    #[tokio::test]
    async fn test_skips_undecodable_records() {
        let store = Arc::new(InMemoryLogStore::new());
        seed(&store, &[add("b1", 1)]).await;
        store
            .append(
                &keys().event_stream,
                &vec![("v".to_string(), "1".to_string()), ("kind".to_string(), "NOPE".to_string())],
            )
            .await
            .unwrap();
        seed(
            &store,
            &[EventEnvelope::rejected("TATA-INR", CommandKind::PlaceLimit, RejectReason::InvalidQty)],
        )
        .await;

        let mut feed = MarketFeed::new(&keys(), store.clone(), FEED_FROM_START).with_block_ms(10);
        let events = feed.next_batch().await.unwrap();

        let kinds: Vec<_> = events.iter().map(EventEnvelope::kind).collect();
        assert_eq!(kinds, vec![EventKind::BookDelta, EventKind::CommandRejected]);
        assert_eq!(feed.cursor(), "3-0");
    }

    #[tokio::test]
    async fn test_from_now_ignores_history() {
        let store = Arc::new(InMemoryLogStore::new());
        seed(&store, &[add("old", 1)]).await;

        let mut feed = MarketFeed::new(&keys(), store.clone(), FEED_FROM_NOW).with_block_ms(500);
        let reader = tokio::spawn(async move { feed.next_batch().await });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        seed(&store, &[add("new", 2)]).await;

        let events = reader.await.unwrap().unwrap();
        assert_eq!(events.len(), 1);
        assert_matches!(
            &events[0].body,
            EventBody::BookDelta { payload: BookDelta::Add { order_id, .. }, .. } if order_id == "new"
        );
    }

    #[tokio::test]
    async fn test_from_now_keeps_events_appended_between_reads() {
        let store = Arc::new(InMemoryLogStore::new());
        seed(&store, &[add("old", 1)]).await;

        let mut feed = MarketFeed::new(&keys(), store.clone(), FEED_FROM_NOW).with_block_ms(20);
        assert!(feed.next_batch().await.unwrap().is_empty());
        assert_eq!(feed.cursor(), "1-0");

        // Appended while no read is in flight
        seed(&store, &[add("gap", 2)]).await;

        let events = feed.next_batch().await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].book_seq(), Some(2));
        assert_eq!(feed.cursor(), "2-0");
    }

    #[tokio::test]
    async fn test_from_now_on_empty_stream_starts_at_beginning() {
        let store = Arc::new(InMemoryLogStore::new());

        let mut feed = MarketFeed::new(&keys(), store.clone(), FEED_FROM_NOW).with_block_ms(20);
        assert!(feed.next_batch().await.unwrap().is_empty());
        assert_eq!(feed.cursor(), FEED_FROM_START);

        seed(&store, &[add("first", 1)]).await;
        assert_eq!(feed.next_batch().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stream_yields_in_order() {
        let store = Arc::new(InMemoryLogStore::new());
        seed(&store, &[add("b1", 1), add("b2", 2), add("b3", 3)]).await;

        let feed = MarketFeed::new(&keys(), store.clone(), FEED_FROM_START)
            .with_count(2)
            .with_block_ms(10);
        let events: Vec<_> = feed.into_stream().take(3).collect().await;

        let seqs: Vec<_> = events
            .into_iter()
            .map(|e| e.unwrap().book_seq())
            .collect();
        assert_eq!(seqs, vec![Some(1), Some(2), Some(3)]);
    }

    #[tokio::test]
    async fn test_stream_ends_on_store_error() {
        let store = Arc::new(InMemoryLogStore::new());
        let feed = MarketFeed::new(&keys(), store, "not-an-id").with_block_ms(10);

        let items: Vec<_> = feed.into_stream().collect().await;
        assert_eq!(items.len(), 1);
        assert_matches!(items[0], Err(StoreError::InvalidArgument { name: "after_id", .. }));
    }

    #[test]
    fn test_count_is_clamped() {
        let store: Arc<dyn LogStore> = Arc::new(InMemoryLogStore::new());
        let feed = MarketFeed::new(&keys(), store, FEED_FROM_START).with_count(0);
        assert_eq!(feed.count, 1);
    }
}
