//! Command record encoding
//!
//! Fields: `v, market, kind, commandId, orderId` plus `side, price, qty`
//! for PLACE_LIMIT, then an optional `seq`.

use super::primitives::{parse_canonical_decimal, push, read_field, read_non_empty};
use super::{check_version, DecodeError, DecodeResult, FieldMap, StreamFields, WIRE_VERSION};
use crate::command::{Command, CommandEnvelope, CommandKind};
use crate::domain::Side;

/// Encode a command into stream fields
pub fn encode_command(envelope: &CommandEnvelope) -> StreamFields {
    let mut fields = StreamFields::with_capacity(8);
    push(&mut fields, "v", WIRE_VERSION);
    push(&mut fields, "market", envelope.market.as_str());
    push(&mut fields, "kind", envelope.kind().as_str());
    push(&mut fields, "commandId", envelope.command_id.as_str());

    match &envelope.command {
        Command::PlaceLimit {
            order_id,
            side,
            price,
            qty,
        } => {
            push(&mut fields, "orderId", order_id.as_str());
            push(&mut fields, "side", side.as_str());
            push(&mut fields, "price", price.to_string());
            push(&mut fields, "qty", qty.to_string());
        }
        Command::Cancel { order_id } => {
            push(&mut fields, "orderId", order_id.as_str());
        }
    }

    if let Some(seq) = envelope.seq {
        push(&mut fields, "seq", seq.to_string());
    }

    fields
}

/// Decode a command record; the first failing check wins
pub fn decode_command(fields: &FieldMap) -> DecodeResult<CommandEnvelope> {
    check_version(fields)?;

    let market = read_non_empty(fields, "market").ok_or(DecodeError::MissingMarket)?;
    let command_id = read_non_empty(fields, "commandId").ok_or(DecodeError::MissingCommandId)?;
    let kind = read_field(fields, "kind")
        .and_then(CommandKind::parse)
        .ok_or(DecodeError::InvalidCommandKind)?;
    let order_id = read_non_empty(fields, "orderId").ok_or(DecodeError::MissingOrderId)?;

    let command = match kind {
        CommandKind::Cancel => Command::Cancel {
            order_id: order_id.to_string(),
        },
        CommandKind::PlaceLimit => {
            let side = read_field(fields, "side")
                .and_then(Side::parse)
                .ok_or(DecodeError::InvalidSide)?;
            let price = parse_canonical_decimal(read_field(fields, "price"))
                .ok_or(DecodeError::InvalidPrice)?;
            let qty = parse_canonical_decimal(read_field(fields, "qty"))
                .ok_or(DecodeError::InvalidQty)?;

            Command::PlaceLimit {
                order_id: order_id.to_string(),
                side,
                price,
                qty,
            }
        }
    };

    let seq = match read_field(fields, "seq") {
        None => None,
        Some(raw) => Some(parse_canonical_decimal(Some(raw)).ok_or(DecodeError::InvalidSeq)?),
    };

    Ok(CommandEnvelope {
        command_id: command_id.to_string(),
        market: market.to_string(),
        seq,
        command,
    })
}
