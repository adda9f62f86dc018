//! Apply one decoded command to a book and build the resulting events

use tracing::debug;

use crate::book::OrderBook;
use crate::command::{Command, CommandEnvelope};
use crate::domain::{CancelInput, PlaceLimitInput};
use crate::event::{EventEnvelope, TradePayload};

/// Outcome of applying one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub events: Vec<EventEnvelope>,
    pub accepted: bool,
    pub trades: usize,
}

/// Apply a command and return the events to append, in order
///
/// Accepted commands yield every TRADE, then every BOOK_DELTA, all stamped
/// with the book sequence. A rejection yields exactly one COMMAND_REJECTED.
pub fn apply_command(book: &mut OrderBook, envelope: &CommandEnvelope) -> Applied {
    let seq = envelope
        .seq
        .unwrap_or_else(|| book.last_seq().saturating_add(1));

    let outcome = match &envelope.command {
        Command::PlaceLimit {
            order_id,
            side,
            price,
            qty,
        } => book
            .place_limit(PlaceLimitInput {
                market: envelope.market.clone(),
                order_id: order_id.clone(),
                side: *side,
                price: *price,
                qty: *qty,
                seq,
            })
            .map(|report| (report.seq, report.trades, report.deltas)),
        Command::Cancel { order_id } => book
            .cancel(CancelInput {
                market: envelope.market.clone(),
                order_id: order_id.clone(),
                seq,
            })
            .map(|report| (report.seq, Vec::new(), report.deltas)),
    };

    match outcome {
        Ok((book_seq, trades, deltas)) => {
            let market = book.market();
            let mut events = Vec::with_capacity(trades.len() + deltas.len());
            events.extend(trades.iter().map(|trade| {
                EventEnvelope::trade(market, book_seq, TradePayload::from(trade))
                    .with_command_id(envelope.command_id.as_str())
            }));
            events.extend(deltas.into_iter().map(|delta| {
                EventEnvelope::book_delta(market, book_seq, delta)
                    .with_command_id(envelope.command_id.as_str())
            }));

            Applied {
                events,
                accepted: true,
                trades: trades.len(),
            }
        }
        Err(reason) => {
            debug!(
                market = %envelope.market,
                command_id = %envelope.command_id,
                kind = %envelope.kind(),
                seq = %seq,
                reason = %reason,
                "Command rejected"
            );
            // Mismatched commands are reported under the market they named
            let event = EventEnvelope::rejected(envelope.market.as_str(), envelope.kind(), reason)
                .with_command_id(envelope.command_id.as_str());

            Applied {
                events: vec![event],
                accepted: false,
                trades: 0,
            }
        }
    }
}
