//! Single-market limit order matching engine
//!
//! The book matches incoming limit orders by price-time priority. Each
//! market has its own [`OrderBook`], fed by a command stream and writing
//! trades, book deltas and rejections to an event stream.
//!
//! # Layout
//!
//! - [`ladder`], [`level`], [`matching`], [`book`]: the in-memory book
//! - [`codec`]: flat string field encoding of commands and events
//! - [`store`]: append-only log store (Redis streams or in-memory)
//! - [`runtime`]: per-market workers that drive a book from the log
//! - [`feed`]: reader for a market's event log

pub mod book;
pub mod codec;
pub mod command;
pub mod domain;
pub mod error;
pub mod event;
pub mod feed;
pub mod ladder;
pub mod level;
pub mod matching;
pub mod result;
pub mod runtime;
pub mod store;

pub use book::OrderBook;
pub use codec::{decode_command, decode_event, encode_command, encode_event, DecodeError};
pub use command::{Command, CommandEnvelope, CommandKind};
pub use domain::{
    BookDelta, CancelInput, DeltaType, LevelView, MarketId, OrderId, PlaceLimitInput, Price, Qty,
    RestingOrder, Seq, Side, Trade,
};
pub use error::{RejectReason, RuntimeError};
pub use event::{EventBody, EventEnvelope, EventKind, TradePayload};
pub use feed::{MarketFeed, FEED_FROM_NOW, FEED_FROM_START};
pub use result::{CancelReport, PlaceLimitReport};
pub use runtime::{build_workers, run_markets, MarketWorker};
pub use store::{create_log_store, InMemoryLogStore, LogStore, RedisLogStore, StoreError, StoreType};
