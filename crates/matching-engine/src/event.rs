//! Event types for the matching engine
//!
//! These are appended to the per-market event log. TRADE and BOOK_DELTA
//! carry the book sequence they were produced at; rejections carry none
//! because a rejection does not advance the book.

use serde::Serialize;

use crate::command::CommandKind;
use crate::domain::{BookDelta, MarketId, OrderId, Price, Qty, Seq, Side, Trade};
use crate::error::RejectReason;

/// Discriminator of [`EventBody`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Trade,
    BookDelta,
    CommandRejected,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Trade => "TRADE",
            EventKind::BookDelta => "BOOK_DELTA",
            EventKind::CommandRejected => "COMMAND_REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TRADE" => Some(EventKind::Trade),
            "BOOK_DELTA" => Some(EventKind::BookDelta),
            "COMMAND_REJECTED" => Some(EventKind::CommandRejected),
            _ => None,
        }
    }
}

/// Trade as it appears on the event log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradePayload {
    pub taker_order_id: OrderId,
    pub maker_order_id: OrderId,
    pub price: Price,
    pub qty: Qty,
    pub taker_side: Side,
}

impl From<&Trade> for TradePayload {
    fn from(trade: &Trade) -> Self {
        Self {
            taker_order_id: trade.taker_order_id.clone(),
            maker_order_id: trade.maker_order_id.clone(),
            price: trade.price,
            qty: trade.qty,
            taker_side: trade.taker_side,
        }
    }
}

/// Kind-specific part of an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventBody {
    #[serde(rename_all = "camelCase")]
    Trade { book_seq: Seq, payload: TradePayload },
    #[serde(rename_all = "camelCase")]
    BookDelta { book_seq: Seq, payload: BookDelta },
    #[serde(rename_all = "camelCase")]
    CommandRejected {
        command_kind: CommandKind,
        reject_reason: RejectReason,
    },
}

/// Event in the matching engine's output log
///
/// `event_id` is assigned by the log store, never by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub market: MarketId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(flatten)]
    pub body: EventBody,
}

impl EventEnvelope {
    pub fn trade(market: impl Into<MarketId>, book_seq: Seq, payload: TradePayload) -> Self {
        Self {
            market: market.into(),
            command_id: None,
            event_id: None,
            body: EventBody::Trade { book_seq, payload },
        }
    }

    pub fn book_delta(market: impl Into<MarketId>, book_seq: Seq, payload: BookDelta) -> Self {
        Self {
            market: market.into(),
            command_id: None,
            event_id: None,
            body: EventBody::BookDelta { book_seq, payload },
        }
    }

    pub fn rejected(
        market: impl Into<MarketId>,
        command_kind: CommandKind,
        reject_reason: RejectReason,
    ) -> Self {
        Self {
            market: market.into(),
            command_id: None,
            event_id: None,
            body: EventBody::CommandRejected {
                command_kind,
                reject_reason,
            },
        }
    }

    pub fn with_command_id(mut self, command_id: impl Into<String>) -> Self {
        self.command_id = Some(command_id.into());
        self
    }

    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    pub fn kind(&self) -> EventKind {
        match self.body {
            EventBody::Trade { .. } => EventKind::Trade,
            EventBody::BookDelta { .. } => EventKind::BookDelta,
            EventBody::CommandRejected { .. } => EventKind::CommandRejected,
        }
    }

    /// Book sequence, absent on rejections
    pub fn book_seq(&self) -> Option<Seq> {
        match self.body {
            EventBody::Trade { book_seq, .. } | EventBody::BookDelta { book_seq, .. } => {
                Some(book_seq)
            }
            EventBody::CommandRejected { .. } => None,
        }
    }
}
