//! Result types for book operations

use super::domain::{BookDelta, Qty, Seq, Trade};

/// Outcome of an accepted limit order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceLimitReport {
    /// Sequence the book advanced to
    pub seq: Seq,
    /// Trades in execution order
    pub trades: Vec<Trade>,
    /// FILL deltas interleaved in execution order, then at most one ADD
    pub deltas: Vec<BookDelta>,
    /// Quantity left resting (0 if fully filled)
    pub remaining_qty: Qty,
}

impl PlaceLimitReport {
    /// Check if any trades were generated
    pub fn has_trades(&self) -> bool {
        !self.trades.is_empty()
    }

    /// Total quantity filled
    pub fn filled_qty(&self) -> Qty {
        self.trades.iter().map(|t| t.qty).sum()
    }

    /// Whether a remainder was added to the book
    pub fn rested(&self) -> bool {
        self.remaining_qty > 0
    }
}

/// Outcome of an accepted cancel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReport {
    /// Sequence the book advanced to
    pub seq: Seq,
    /// Whether a resting order was found and removed
    pub cancelled: bool,
    /// One CANCEL delta when `cancelled`, otherwise empty
    pub deltas: Vec<BookDelta>,
}

impl CancelReport {
    /// Order was found and removed
    pub fn cancelled(seq: Seq, delta: BookDelta) -> Self {
        Self {
            seq,
            cancelled: true,
            deltas: vec![delta],
        }
    }

    /// Order was not resting (already filled, cancelled or never existed)
    pub fn not_found(seq: Seq) -> Self {
        Self {
            seq,
            cancelled: false,
            deltas: Vec::new(),
        }
    }
}
