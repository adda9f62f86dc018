//! Domain types for the Matching Engine
//!
//! Prices, quantities and sequence numbers are plain `u128` integers.
//! Nothing in the engine touches floating point.

use serde::Serialize;

/// Limit price in integer ticks
pub type Price = u128;
/// Order quantity in integer lots
pub type Qty = u128;
/// Per-market book sequence number
pub type Seq = u128;
/// Opaque market identifier
pub type MarketId = String;
/// Opaque order identifier, unique among resting orders of one market
pub type OrderId = String;

// ============================================================================
// Side
// ============================================================================

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order, rests on the bid side
    Buy,
    /// Sell order, rests on the ask side
    Sell,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Wire representation (`BUY` / `SELL`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }

    /// Parse the exact wire representation. Case matters.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BUY" => Some(Side::Buy),
            "SELL" => Some(Side::Sell),
            _ => None,
        }
    }

    /// Whether an incoming order on this side at `limit` may trade against
    /// a resting order on the opposite side at `resting`.
    pub fn crosses(&self, limit: Price, resting: Price) -> bool {
        match self {
            Side::Buy => resting <= limit,
            Side::Sell => resting >= limit,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Book inputs
// ============================================================================

/// Input to [`OrderBook::place_limit`](crate::book::OrderBook::place_limit)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceLimitInput {
    pub market: MarketId,
    pub order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub qty: Qty,
    pub seq: Seq,
}

/// Input to [`OrderBook::cancel`](crate::book::OrderBook::cancel)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelInput {
    pub market: MarketId,
    pub order_id: OrderId,
    pub seq: Seq,
}

// ============================================================================
// Resting Order
// ============================================================================

/// Order resting in the book awaiting a match
///
/// Owned by the book's order index. The price level queue only holds a
/// slot pointing back at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestingOrder {
    pub order_id: OrderId,
    pub side: Side,
    pub price: Price,
    pub qty_remaining: Qty,
    /// Sequence of the command that placed it (arrival order)
    pub seq: Seq,
}

impl RestingOrder {
    /// Reduce quantity after a fill
    pub fn fill(&mut self, qty: Qty) {
        self.qty_remaining = self.qty_remaining.saturating_sub(qty);
    }

    /// Check if order is completely filled
    pub fn is_filled(&self) -> bool {
        self.qty_remaining == 0
    }
}

// ============================================================================
// Trade
// ============================================================================

/// One match between an incoming (taker) and a resting (maker) order
///
/// Execution price is ALWAYS the maker's price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub market: MarketId,
    pub taker_order_id: OrderId,
    pub maker_order_id: OrderId,
    pub price: Price,
    pub qty: Qty,
    pub taker_side: Side,
    /// Sequence of the triggering command
    pub seq: Seq,
}

// ============================================================================
// Book Delta
// ============================================================================

/// Minimal change to the visible book a replica must apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookDelta {
    /// A new order started resting
    #[serde(rename_all = "camelCase")]
    Add {
        order_id: OrderId,
        side: Side,
        price: Price,
        qty: Qty,
    },
    /// A maker's quantity was reduced by `qty`, possibly to zero
    #[serde(rename_all = "camelCase")]
    Fill {
        maker_order_id: OrderId,
        taker_order_id: OrderId,
        price: Price,
        qty: Qty,
    },
    /// A resting order was removed by request
    #[serde(rename_all = "camelCase")]
    Cancel { order_id: OrderId },
}

impl BookDelta {
    /// Wire name of the delta type
    pub fn delta_type(&self) -> DeltaType {
        match self {
            BookDelta::Add { .. } => DeltaType::Add,
            BookDelta::Fill { .. } => DeltaType::Fill,
            BookDelta::Cancel { .. } => DeltaType::Cancel,
        }
    }
}

/// Discriminator of [`BookDelta`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaType {
    Add,
    Fill,
    Cancel,
}

impl DeltaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeltaType::Add => "ADD",
            DeltaType::Fill => "FILL",
            DeltaType::Cancel => "CANCEL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADD" => Some(DeltaType::Add),
            "FILL" => Some(DeltaType::Fill),
            "CANCEL" => Some(DeltaType::Cancel),
            _ => None,
        }
    }
}

// ============================================================================
// Depth view
// ============================================================================

/// Aggregated price level, used for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelView {
    pub price: Price,
    pub qty: Qty,
    pub order_count: usize,
}

// ============================================================================
// Tests
// ============================================================================
