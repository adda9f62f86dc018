//! Order book for a single market
//!
//! CRITICAL PROPERTIES:
//! 1. Bids sorted descending, asks ascending (best at the front)
//! 2. Each price level is a FIFO queue
//! 3. `last_seq` only ever increases
//! 4. A level exists iff its price is in the ladder iff it holds a live order
//!
//! `place_limit` and `cancel` are the only mutating entry points.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::domain::{
    BookDelta, CancelInput, LevelView, MarketId, PlaceLimitInput, Price, Qty, RestingOrder, Seq,
    Side,
};
use crate::error::RejectReason;
use crate::ladder::{LadderOrder, PriceLadder};
use crate::level::{OrderIndex, PriceLevel};
use crate::matching::match_incoming;
use crate::result::{CancelReport, PlaceLimitReport};

// ============================================================================
// Book Side
// ============================================================================

/// One side of the book: price levels plus their ladder
#[derive(Debug, Clone)]
pub(crate) struct BookSide {
    levels: HashMap<Price, PriceLevel>,
    ladder: PriceLadder,
}

impl BookSide {
    fn new(side: Side) -> Self {
        Self {
            levels: HashMap::new(),
            ladder: PriceLadder::new(LadderOrder::for_side(side)),
        }
    }

    pub(crate) fn best_price(&self) -> Option<Price> {
        self.ladder.best()
    }

    pub(crate) fn level_mut(&mut self, price: Price) -> Option<&mut PriceLevel> {
        self.levels.get_mut(&price)
    }

    fn rest(&mut self, order: &RestingOrder) {
        self.levels
            .entry(order.price)
            .or_default()
            .push(order.order_id.clone(), order.seq);
        self.ladder.insert(order.price);
    }

    /// Advance, compact, and drop the level once nothing live is left
    pub(crate) fn prune(&mut self, price: Price, orders: &OrderIndex) {
        let exhausted = match self.levels.get_mut(&price) {
            Some(level) => {
                level.advance_head(orders);
                level.compact();
                level.is_exhausted()
            }
            None => true,
        };

        if exhausted {
            self.levels.remove(&price);
            self.ladder.remove(price);
        }
    }

    fn remove_order(&mut self, price: Price, order_id: &str, orders: &OrderIndex) {
        if let Some(level) = self.levels.get_mut(&price) {
            level.remove(order_id);
        }
        self.prune(price, orders);
    }

    fn depth(&self, orders: &OrderIndex, max_levels: usize) -> Vec<LevelView> {
        self.ladder
            .iter()
            .take(max_levels)
            .filter_map(|price| {
                let level = self.levels.get(&price)?;
                Some(LevelView {
                    price,
                    qty: level.total_qty(orders),
                    order_count: level.iter_live(orders).count(),
                })
            })
            .collect()
    }

    fn level_count(&self) -> usize {
        self.ladder.len()
    }
}

// ============================================================================
// Order Book
// ============================================================================

/// Price/time priority limit order book bound to one market
#[derive(Debug, Clone)]
pub struct OrderBook {
    market: MarketId,
    bids: BookSide,
    asks: BookSide,
    orders: OrderIndex,
    last_seq: Seq,
}

impl OrderBook {
    /// Create an empty book for `market`
    pub fn new(market: impl Into<MarketId>) -> Self {
        Self {
            market: market.into(),
            bids: BookSide::new(Side::Buy),
            asks: BookSide::new(Side::Sell),
            orders: OrderIndex::new(),
            last_seq: 0,
        }
    }

    /// Place a limit order
    ///
    /// Validation order: market, sequence, price, quantity, duplicate id.
    /// Market and stale-sequence rejections leave `last_seq` alone; every
    /// later rejection has already committed the sequence.
    pub fn place_limit(&mut self, input: PlaceLimitInput) -> Result<PlaceLimitReport, RejectReason> {
        self.validate_market(&input.market)?;
        self.bump_seq(input.seq)?;
        Self::validate_limit(input.price, input.qty)?;

        if self.orders.contains_key(&input.order_id) {
            return Err(RejectReason::DuplicateOrderId);
        }

        let mut trades = Vec::new();
        let mut deltas = Vec::new();

        let opposite = match input.side {
            Side::Buy => &mut self.asks,
            Side::Sell => &mut self.bids,
        };
        let remaining_qty = match_incoming(&input, opposite, &mut self.orders, &mut trades, &mut deltas);

        if remaining_qty > 0 {
            let order = RestingOrder {
                order_id: input.order_id.clone(),
                side: input.side,
                price: input.price,
                qty_remaining: remaining_qty,
                seq: input.seq,
            };

            match input.side {
                Side::Buy => self.bids.rest(&order),
                Side::Sell => self.asks.rest(&order),
            }
            self.orders.insert(order.order_id.clone(), order);

            deltas.push(BookDelta::Add {
                order_id: input.order_id.clone(),
                side: input.side,
                price: input.price,
                qty: remaining_qty,
            });
        }

        debug!(
            market = %self.market,
            order_id = %input.order_id,
            side = %input.side,
            seq = %input.seq,
            trades = trades.len(),
            remaining = %remaining_qty,
            "Limit order placed"
        );

        Ok(PlaceLimitReport {
            seq: input.seq,
            trades,
            deltas,
            remaining_qty,
        })
    }

    /// Cancel a resting order
    ///
    /// Cancelling an unknown or already filled order is not a rejection:
    /// the sequence is still consumed and `cancelled` is false.
    pub fn cancel(&mut self, input: CancelInput) -> Result<CancelReport, RejectReason> {
        self.validate_market(&input.market)?;
        self.bump_seq(input.seq)?;

        let order = match self.orders.remove(&input.order_id) {
            Some(order) => order,
            None => return Ok(CancelReport::not_found(input.seq)),
        };

        match order.side {
            Side::Buy => self.bids.remove_order(order.price, &order.order_id, &self.orders),
            Side::Sell => self.asks.remove_order(order.price, &order.order_id, &self.orders),
        }

        info!(order_id = %input.order_id, market = %self.market, "Order cancelled");

        Ok(CancelReport::cancelled(
            input.seq,
            BookDelta::Cancel {
                order_id: input.order_id,
            },
        ))
    }

    /// Market this book is bound to
    pub fn market(&self) -> &str {
        &self.market
    }

    /// Highest accepted sequence so far
    pub fn last_seq(&self) -> Seq {
        self.last_seq
    }

    /// Get best bid price (highest buy)
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_price()
    }

    /// Get best ask price (lowest sell)
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_price()
    }

    /// Look up a resting order
    pub fn get_order(&self, order_id: &str) -> Option<&RestingOrder> {
        self.orders.get(order_id)
    }

    /// Number of resting orders
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Number of occupied price levels on one side
    pub fn level_count(&self, side: Side) -> usize {
        match side {
            Side::Buy => self.bids.level_count(),
            Side::Sell => self.asks.level_count(),
        }
    }

    /// Aggregated levels of one side, best first
    pub fn depth(&self, side: Side, max_levels: usize) -> Vec<LevelView> {
        match side {
            Side::Buy => self.bids.depth(&self.orders, max_levels),
            Side::Sell => self.asks.depth(&self.orders, max_levels),
        }
    }

    /// Check if book is empty
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    fn validate_market(&self, market: &str) -> Result<(), RejectReason> {
        if market != self.market {
            return Err(RejectReason::MarketMismatch);
        }
        Ok(())
    }

    fn bump_seq(&mut self, next: Seq) -> Result<(), RejectReason> {
        if next <= self.last_seq {
            return Err(RejectReason::SeqOutOfOrder);
        }
        self.last_seq = next;
        Ok(())
    }

    fn validate_limit(price: Price, qty: Qty) -> Result<(), RejectReason> {
        if price == 0 {
            return Err(RejectReason::InvalidPrice);
        }
        if qty == 0 {
            return Err(RejectReason::InvalidQty);
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
