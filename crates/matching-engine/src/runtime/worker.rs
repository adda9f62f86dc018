//! Per-market worker loop
//!
//! One worker owns one market's book and is the only code that mutates it.
//! Each iteration reads a batch of commands through the market's consumer
//! group, applies them in order, appends every resulting event and only
//! then acknowledges the command. A crash between append and ack causes
//! redelivery on restart.

use std::sync::Arc;
use std::time::Instant;

use common::StreamKeys;
use observability::{CommandOutcome, MarketMetrics};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::book::OrderBook;
use crate::codec::{decode_command, encode_event};
use crate::error::RuntimeError;
use crate::runtime::handling::apply_command;
use crate::store::{GroupCursor, GroupRead, GroupStart, LogStore, StreamRecord};

/// Lifecycle of a [`MarketWorker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Consumer group not yet ensured
    Initializing,
    /// Waiting on a blocking read
    Polling,
    /// Applying a batch; never interrupted by shutdown
    Processing,
    /// Loop exited
    Stopped,
}

/// Read settings shared by all workers of a process
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub consumer_name: String,
    pub read_count: usize,
    pub block_ms: u64,
}

impl From<&config::EngineConfig> for WorkerSettings {
    fn from(engine: &config::EngineConfig) -> Self {
        Self {
            consumer_name: engine.consumer_name.clone(),
            read_count: engine.read_count,
            block_ms: engine.block_ms,
        }
    }
}

/// Counters for one worker run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub accepted: u64,
    pub rejected: u64,
    pub malformed: u64,
    pub events_appended: u64,
}

impl WorkerStats {
    pub fn records(&self) -> u64 {
        self.accepted + self.rejected + self.malformed
    }

    fn absorb(&mut self, other: WorkerStats) {
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        self.malformed += other.malformed;
        self.events_appended += other.events_appended;
    }
}

/// Single-market engine worker
pub struct MarketWorker {
    keys: StreamKeys,
    settings: WorkerSettings,
    store: Arc<dyn LogStore>,
    book: OrderBook,
    state: WorkerState,
    cursor: GroupCursor,
    metrics: MarketMetrics,
}

impl MarketWorker {
    pub fn new(keys: StreamKeys, settings: WorkerSettings, store: Arc<dyn LogStore>) -> Self {
        let metrics = MarketMetrics::new(&keys.market);
        Self {
            book: OrderBook::new(keys.market.as_str()),
            keys,
            settings,
            store,
            state: WorkerState::Initializing,
            cursor: GroupCursor::Pending,
            metrics,
        }
    }

    pub fn market(&self) -> &str {
        &self.keys.market
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Ensure the consumer group exists, starting from the beginning of the log
    pub async fn initialize(&mut self) -> Result<(), RuntimeError> {
        self.state = WorkerState::Initializing;
        self.store
            .ensure_consumer_group(&self.keys.command_stream, &self.keys.group, GroupStart::Beginning)
            .await?;
        self.state = WorkerState::Polling;

        info!(
            market = %self.keys.market,
            stream = %self.keys.command_stream,
            group = %self.keys.group,
            consumer = %self.settings.consumer_name,
            "Market worker initialized"
        );
        Ok(())
    }

    /// Read and process one batch
    ///
    /// Until the first empty read, this consumer's pending entries are
    /// drained before any new command is requested.
    pub async fn poll_once(&mut self) -> Result<WorkerStats, RuntimeError> {
        self.state = WorkerState::Polling;

        let mut records = self.read(self.cursor).await?;
        if records.is_empty() && self.cursor == GroupCursor::Pending {
            debug!(market = %self.keys.market, "No pending commands, switching to new commands");
            self.cursor = GroupCursor::New;
            records = self.read(GroupCursor::New).await?;
        } else if self.cursor == GroupCursor::Pending {
            info!(
                market = %self.keys.market,
                count = records.len(),
                "Reprocessing unacknowledged commands"
            );
        }

        if records.is_empty() {
            return Ok(WorkerStats::default());
        }

        self.state = WorkerState::Processing;
        let started = Instant::now();
        let stats = self.process_batch(records).await?;
        self.metrics.record_batch(started.elapsed());
        self.state = WorkerState::Polling;

        Ok(stats)
    }

    /// Run until `token` is cancelled or the store fails
    #[instrument(skip_all, fields(market = %self.keys.market))]
    pub async fn run(mut self, token: CancellationToken) -> Result<WorkerStats, RuntimeError> {
        let result = self.run_loop(&token).await;
        self.state = WorkerState::Stopped;

        match &result {
            Ok(stats) => info!(
                last_seq = %self.book.last_seq(),
                resting = self.book.order_count(),
                records = stats.records(),
                events = stats.events_appended,
                "Market worker stopped"
            ),
            Err(e) => warn!(error = %e, "Market worker failed"),
        }
        result
    }

    async fn run_loop(&mut self, token: &CancellationToken) -> Result<WorkerStats, RuntimeError> {
        self.initialize().await?;

        let mut total = WorkerStats::default();
        while !token.is_cancelled() {
            total.absorb(self.poll_once().await?);
        }
        Ok(total)
    }

    async fn read(&self, cursor: GroupCursor) -> Result<Vec<StreamRecord>, RuntimeError> {
        let records = self
            .store
            .read_group(GroupRead {
                stream: &self.keys.command_stream,
                group: &self.keys.group,
                consumer: &self.settings.consumer_name,
                cursor,
                count: self.settings.read_count,
                block_ms: self.settings.block_ms,
            })
            .await?;
        Ok(records)
    }

    async fn process_batch(&mut self, records: Vec<StreamRecord>) -> Result<WorkerStats, RuntimeError> {
        let mut stats = WorkerStats::default();
        let mut last_event_id = None;

        for record in records {
            let envelope = match decode_command(&record.fields) {
                Ok(envelope) => envelope,
                Err(reason) => {
                    warn!(
                        market = %self.keys.market,
                        record_id = %record.id,
                        reason = %reason,
                        "Dropping malformed command"
                    );
                    self.ack(&record.id).await?;
                    self.metrics.record_command(CommandOutcome::Malformed);
                    stats.malformed += 1;
                    continue;
                }
            };

            let applied = apply_command(&mut self.book, &envelope);

            for event in &applied.events {
                let id = self
                    .store
                    .append(&self.keys.event_stream, &encode_event(event))
                    .await?;
                last_event_id = Some(id);
            }
            self.ack(&record.id).await?;

            let appended = applied.events.len() as u64;
            stats.events_appended += appended;
            self.metrics.record_events_appended(appended);
            self.metrics.record_trades(applied.trades as u64);
            if applied.accepted {
                stats.accepted += 1;
                self.metrics.record_command(CommandOutcome::Accepted);
            } else {
                stats.rejected += 1;
                self.metrics.record_command(CommandOutcome::Rejected);
            }

            debug!(
                market = %self.keys.market,
                record_id = %record.id,
                command_id = %envelope.command_id,
                accepted = applied.accepted,
                events = applied.events.len(),
                "Command applied"
            );
        }

        self.metrics.set_last_seq(self.book.last_seq());
        if let Some(id) = last_event_id {
            self.notify(&id).await;
        }

        Ok(stats)
    }

    async fn ack(&self, id: &str) -> Result<(), RuntimeError> {
        let acked = self
            .store
            .ack(&self.keys.command_stream, &self.keys.group, id)
            .await?;
        if acked == 0 {
            warn!(market = %self.keys.market, record_id = %id, "Command was not pending when acknowledged");
        }
        Ok(())
    }

    /// Best-effort wake-up for event readers
    async fn notify(&self, last_event_id: &str) {
        if let Err(e) = self
            .store
            .publish(&self.keys.notify_channel, last_event_id)
            .await
        {
            warn!(
                market = %self.keys.market,
                channel = %self.keys.notify_channel,
                error = %e,
                "Failed to publish event notification"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_event, encode_command, StreamFields};
    use crate::command::{Command, CommandEnvelope};
    use crate::domain::Side;
    use crate::event::EventKind;
    use crate::store::InMemoryLogStore;

    const MARKET: &str = "TATA-INR";

    fn settings() -> WorkerSettings {
        WorkerSettings {
            consumer_name: "engine-test".to_string(),
            read_count: 10,
            block_ms: 10,
        }
    }

    fn keys() -> StreamKeys {
        StreamKeys::new("test", MARKET)
    }

    fn worker(store: &Arc<InMemoryLogStore>) -> MarketWorker {
        MarketWorker::new(keys(), settings(), store.clone())
    }

    fn place(id: &str, side: Side, price: u128, qty: u128) -> StreamFields {
        encode_command(&CommandEnvelope::new(
            format!("cmd-{id}"),
            MARKET,
            Command::PlaceLimit {
                order_id: id.to_string(),
                side,
                price,
                qty,
            },
        ))
    }

    async fn event_kinds(store: &InMemoryLogStore) -> Vec<EventKind> {
        store
            .records(&keys().event_stream)
            .await
            .iter()
            .map(|r| decode_event(&r.fields).unwrap().kind())
            .collect()
    }

    #[tokio::test]
    async fn test_batch_appends_events_then_acks() {
        let store = Arc::new(InMemoryLogStore::new());
        let stream = keys().command_stream;
        store.append(&stream, &place("s1", Side::Sell, 100, 5)).await.unwrap();
        store.append(&stream, &place("b1", Side::Buy, 100, 3)).await.unwrap();

        let mut worker = worker(&store);
        worker.initialize().await.unwrap();
        let stats = worker.poll_once().await.unwrap();

        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.events_appended, 3);
        assert_eq!(
            event_kinds(&store).await,
            vec![EventKind::BookDelta, EventKind::Trade, EventKind::BookDelta]
        );
        assert_eq!(store.pending_count(&stream, &keys().group).await, 0);
        assert_eq!(worker.book().get_order("s1").map(|o| o.qty_remaining), Some(2));
        assert_eq!(worker.state(), WorkerState::Polling);
    }

    #[tokio::test]
    async fn test_notification_carries_last_event_id() {
        let store = Arc::new(InMemoryLogStore::new());
        store
            .append(&keys().command_stream, &place("s1", Side::Sell, 100, 5))
            .await
            .unwrap();

        let mut pings = store.subscribe(&keys().notify_channel).await;
        let mut worker = worker(&store);
        worker.initialize().await.unwrap();
        worker.poll_once().await.unwrap();

        let events = store.records(&keys().event_stream).await;
        assert_eq!(pings.try_recv().unwrap(), events[0].id);
        assert!(pings.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_command_is_dropped() {
        let store = Arc::new(InMemoryLogStore::new());
        let stream = keys().command_stream;
        let mut bad = place("b1", Side::Buy, 100, 3);
        for (key, value) in bad.iter_mut() {
            if key == "price" {
                *value = "0100".to_string();
            }
        }
        store.append(&stream, &bad).await.unwrap();
        store.append(&stream, &place("s1", Side::Sell, 100, 5)).await.unwrap();

        let mut pings = store.subscribe(&keys().notify_channel).await;
        let mut worker = worker(&store);
        worker.initialize().await.unwrap();
        let stats = worker.poll_once().await.unwrap();

        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.accepted, 1);
        assert_eq!(store.pending_count(&stream, &keys().group).await, 0);
        // The malformed record did not consume a sequence
        assert_eq!(worker.book().last_seq(), 1);
        assert!(pings.try_recv().is_ok());
        assert!(pings.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_undecodable_bytes_are_dropped_not_retried() {
        let store = Arc::new(InMemoryLogStore::new());
        let stream = keys().command_stream;
        // What a lossy read of a non-UTF-8 price looks like
        let garbled = String::from_utf8_lossy(&[0xff, 0xfe]).into_owned();
        let mut bad = place("b1", Side::Buy, 100, 3);
        for (key, value) in bad.iter_mut() {
            if key == "price" {
                *value = garbled.clone();
            }
        }
        store.append(&stream, &bad).await.unwrap();

        let mut worker = worker(&store);
        worker.initialize().await.unwrap();
        let stats = worker.poll_once().await.unwrap();

        assert_eq!(stats.malformed, 1);
        assert_eq!(store.pending_count(&stream, &keys().group).await, 0);
        assert_eq!(store.stream_len(&keys().event_stream).await, 0);

        // Nothing is left to redeliver
        assert_eq!(worker.poll_once().await.unwrap(), WorkerStats::default());
    }

    #[tokio::test]
    async fn test_deleted_pending_command_is_acked() {
        let store = Arc::new(InMemoryLogStore::new());
        let k = keys();
        store
            .ensure_consumer_group(&k.command_stream, &k.group, GroupStart::Beginning)
            .await
            .unwrap();
        let id = store.append(&k.command_stream, &place("s1", Side::Sell, 100, 5)).await.unwrap();

        // Delivered to a previous run, then removed from the stream before any ack
        store
            .read_group(GroupRead {
                stream: &k.command_stream,
                group: &k.group,
                consumer: "engine-test",
                cursor: GroupCursor::New,
                count: 10,
                block_ms: 10,
            })
            .await
            .unwrap();
        assert!(store.delete(&k.command_stream, &id).await);

        let mut worker = worker(&store);
        worker.initialize().await.unwrap();
        let stats = worker.poll_once().await.unwrap();

        assert_eq!(stats.malformed, 1);
        assert_eq!(store.pending_count(&k.command_stream, &k.group).await, 0);
        assert_eq!(worker.book().last_seq(), 0);
    }

    #[tokio::test]
    async fn test_rejection_is_an_event() {
        let store = Arc::new(InMemoryLogStore::new());
        store
            .append(&keys().command_stream, &place("b1", Side::Buy, 100, 0))
            .await
            .unwrap();

        let mut worker = worker(&store);
        worker.initialize().await.unwrap();
        let stats = worker.poll_once().await.unwrap();

        assert_eq!(stats.rejected, 1);
        assert_eq!(event_kinds(&store).await, vec![EventKind::CommandRejected]);
    }

    #[tokio::test]
    async fn test_pending_commands_are_redelivered_first() {
        let store = Arc::new(InMemoryLogStore::new());
        let k = keys();
        store
            .ensure_consumer_group(&k.command_stream, &k.group, GroupStart::Beginning)
            .await
            .unwrap();
        store.append(&k.command_stream, &place("s1", Side::Sell, 100, 5)).await.unwrap();

        // A previous run received the command and died before acknowledging it
        let delivered = store
            .read_group(GroupRead {
                stream: &k.command_stream,
                group: &k.group,
                consumer: "engine-test",
                cursor: GroupCursor::New,
                count: 10,
                block_ms: 10,
            })
            .await
            .unwrap();
        assert_eq!(delivered.len(), 1);
        store.append(&k.command_stream, &place("s2", Side::Sell, 101, 5)).await.unwrap();

        let mut worker = worker(&store);
        worker.initialize().await.unwrap();

        let first = worker.poll_once().await.unwrap();
        assert_eq!(first.accepted, 1);
        assert!(worker.book().get_order("s1").is_some());
        assert!(worker.book().get_order("s2").is_none());

        let second = worker.poll_once().await.unwrap();
        assert_eq!(second.accepted, 1);
        assert!(worker.book().get_order("s2").is_some());
        assert_eq!(store.pending_count(&k.command_stream, &k.group).await, 0);
    }

    #[tokio::test]
    async fn test_empty_poll_times_out() {
        let store = Arc::new(InMemoryLogStore::new());
        let mut worker = worker(&store);
        worker.initialize().await.unwrap();

        let stats = worker.poll_once().await.unwrap();
        assert_eq!(stats, WorkerStats::default());
    }

    #[tokio::test]
    async fn test_run_stops_when_cancelled() {
        let store = Arc::new(InMemoryLogStore::new());
        store
            .append(&keys().command_stream, &place("s1", Side::Sell, 100, 5))
            .await
            .unwrap();

        let token = CancellationToken::new();
        let handle = tokio::spawn(worker(&store).run(token.clone()));

        for _ in 0..100 {
            if store.stream_len(&keys().event_stream).await > 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        token.cancel();

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.events_appended, 1);
    }

    #[tokio::test]
    async fn test_poll_requires_group() {
        let store = Arc::new(InMemoryLogStore::new());
        let mut worker = worker(&store);
        assert!(matches!(
            worker.poll_once().await,
            Err(RuntimeError::Store(crate::store::StoreError::UnknownGroup { .. }))
        ));
    }
}
