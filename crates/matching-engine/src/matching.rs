//! Core matching algorithm
//!
//! Price-time priority: best opposite price first, FIFO within a level.
//! Every fill executes at the resting (maker) order's price.

use tracing::debug;

use crate::book::BookSide;
use crate::domain::{BookDelta, PlaceLimitInput, Qty, Trade};
use crate::level::OrderIndex;

/// Cross an incoming order against the opposite side of the book
///
/// Appends one trade and one FILL delta per fill, in that order, and
/// returns the quantity left unfilled. Makers that reach zero leave the
/// order index immediately; their queue slots are pruned lazily.
pub(crate) fn match_incoming(
    input: &PlaceLimitInput,
    opposite: &mut BookSide,
    orders: &mut OrderIndex,
    trades: &mut Vec<Trade>,
    deltas: &mut Vec<BookDelta>,
) -> Qty {
    let mut remaining = input.qty;

    while remaining > 0 {
        let best_price = match opposite.best_price() {
            Some(price) => price,
            None => break,
        };

        if !input.side.crosses(input.price, best_price) {
            break;
        }

        let maker_id = match opposite
            .level_mut(best_price)
            .and_then(|level| level.peek_front(orders))
        {
            Some(id) => id,
            None => {
                opposite.prune(best_price, orders);
                continue;
            }
        };

        let (fill_qty, maker_price, maker_filled) = match orders.get_mut(&maker_id) {
            Some(maker) => {
                let fill_qty = maker.qty_remaining.min(remaining);
                maker.fill(fill_qty);
                (fill_qty, maker.price, maker.is_filled())
            }
            None => {
                opposite.prune(best_price, orders);
                continue;
            }
        };
        remaining -= fill_qty;

        debug!(
            market = %input.market,
            taker = %input.order_id,
            maker = %maker_id,
            price = %maker_price,
            qty = %fill_qty,
            "Fill"
        );

        trades.push(Trade {
            market: input.market.clone(),
            taker_order_id: input.order_id.clone(),
            maker_order_id: maker_id.clone(),
            price: maker_price,
            qty: fill_qty,
            taker_side: input.side,
            seq: input.seq,
        });

        if maker_filled {
            orders.remove(&maker_id);
        }

        deltas.push(BookDelta::Fill {
            maker_order_id: maker_id,
            taker_order_id: input.order_id.clone(),
            price: maker_price,
            qty: fill_qty,
        });

        opposite.prune(best_price, orders);
    }

    remaining
}
