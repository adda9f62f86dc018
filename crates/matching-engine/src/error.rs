//! Matching engine error types

use thiserror::Error;

use crate::store::StoreError;

/// Business rejection of a well-formed command
///
/// Surfaced as a `COMMAND_REJECTED` event, never as a process error.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// Command names a different market than the book
    #[error("MARKET_MISMATCH")]
    MarketMismatch,

    /// Sequence not greater than the last accepted one
    #[error("SEQ_OUT_OF_ORDER")]
    SeqOutOfOrder,

    /// Price is zero
    #[error("INVALID_PRICE")]
    InvalidPrice,

    /// Quantity is zero
    #[error("INVALID_QTY")]
    InvalidQty,

    /// Order id is already resting
    #[error("DUPLICATE_ORDER_ID")]
    DuplicateOrderId,
}

impl RejectReason {
    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MarketMismatch => "MARKET_MISMATCH",
            RejectReason::SeqOutOfOrder => "SEQ_OUT_OF_ORDER",
            RejectReason::InvalidPrice => "INVALID_PRICE",
            RejectReason::InvalidQty => "INVALID_QTY",
            RejectReason::DuplicateOrderId => "DUPLICATE_ORDER_ID",
        }
    }

    /// Parse the wire representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MARKET_MISMATCH" => Some(RejectReason::MarketMismatch),
            "SEQ_OUT_OF_ORDER" => Some(RejectReason::SeqOutOfOrder),
            "INVALID_PRICE" => Some(RejectReason::InvalidPrice),
            "INVALID_QTY" => Some(RejectReason::InvalidQty),
            "DUPLICATE_ORDER_ID" => Some(RejectReason::DuplicateOrderId),
            _ => None,
        }
    }

    /// Whether the book consumed the sequence number before rejecting
    pub fn consumes_seq(&self) -> bool {
        !matches!(
            self,
            RejectReason::MarketMismatch | RejectReason::SeqOutOfOrder
        )
    }
}

impl serde::Serialize for RejectReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Errors that stop a market worker
///
/// Only infrastructure failures end up here; bad commands are rejections
/// and bad records are dropped.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Log store failure (connectivity, protocol)
    #[error("Log store error: {0}")]
    Store(#[from] StoreError),

    /// Settings the runtime cannot start with
    #[error("Invalid runtime configuration: {0}")]
    Config(String),

    /// A worker task panicked or was aborted
    #[error("Worker for market {market} failed: {message}")]
    Worker { market: String, message: String },
}
