//! Wire codec for the command and event logs
//!
//! Records are flat string maps. Encoding never fails. Decoding validates
//! the canonical form of every field and returns a typed rejection instead
//! of coercing; callers must handle the `Err` arm.

mod command;
mod event;
mod primitives;

pub use command::{decode_command, encode_command};
pub use event::{decode_event, encode_event};
pub use primitives::{
    is_canonical_decimal, parse_canonical_decimal, read_field, read_non_empty, FieldMap,
    StreamFields, MAX_DECIMAL_LEN, WIRE_VERSION,
};

use thiserror::Error;

/// Why a record could not be decoded
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeError {
    #[error("UNSUPPORTED_VERSION")]
    UnsupportedVersion,
    #[error("MISSING_MARKET")]
    MissingMarket,
    #[error("MISSING_COMMAND_ID")]
    MissingCommandId,
    #[error("INVALID_COMMAND_KIND")]
    InvalidCommandKind,
    #[error("INVALID_EVENT_KIND")]
    InvalidEventKind,
    #[error("MISSING_ORDER_ID")]
    MissingOrderId,
    #[error("MISSING_TAKER_ORDER_ID")]
    MissingTakerOrderId,
    #[error("MISSING_MAKER_ORDER_ID")]
    MissingMakerOrderId,
    #[error("INVALID_SIDE")]
    InvalidSide,
    #[error("INVALID_TAKER_SIDE")]
    InvalidTakerSide,
    #[error("INVALID_PRICE")]
    InvalidPrice,
    #[error("INVALID_QTY")]
    InvalidQty,
    #[error("INVALID_SEQ")]
    InvalidSeq,
    #[error("MISSING_OR_INVALID_BOOK_SEQ")]
    MissingOrInvalidBookSeq,
    #[error("INVALID_DELTA_TYPE")]
    InvalidDeltaType,
    #[error("MISSING_REJECT_REASON")]
    MissingRejectReason,
    #[error("INVALID_REJECT_REASON")]
    InvalidRejectReason,
}

/// Outcome of a decode
pub type DecodeResult<T> = Result<T, DecodeError>;

fn check_version(fields: &FieldMap) -> DecodeResult<()> {
    match read_field(fields, "v") {
        None => Ok(()),
        Some(v) if v == WIRE_VERSION => Ok(()),
        Some(_) => Err(DecodeError::UnsupportedVersion),
    }
}
