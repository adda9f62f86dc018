//! Event record encoding
//!
//! Common fields: `v, market, kind`, then `commandId` / `eventId` when set.
//! TRADE and BOOK_DELTA add `bookSeq` and their payload fields; BOOK_DELTA
//! payloads are flattened with a `deltaType` discriminator.

use super::primitives::{parse_canonical_decimal, push, read_field, read_non_empty};
use super::{check_version, DecodeError, DecodeResult, FieldMap, StreamFields, WIRE_VERSION};
use crate::command::CommandKind;
use crate::domain::{BookDelta, DeltaType, Side};
use crate::error::RejectReason;
use crate::event::{EventBody, EventEnvelope, EventKind, TradePayload};

/// Encode an event into stream fields
///
/// `commandId` and `eventId` are optional on the wire and an empty value is
/// never written: `Some("")` encodes the same as `None` and decodes as `None`.
pub fn encode_event(event: &EventEnvelope) -> StreamFields {
    let mut fields = StreamFields::with_capacity(12);
    push(&mut fields, "v", WIRE_VERSION);
    push(&mut fields, "market", event.market.as_str());
    push(&mut fields, "kind", event.kind().as_str());
    if let Some(command_id) = event.command_id.as_deref().filter(|id| !id.is_empty()) {
        push(&mut fields, "commandId", command_id);
    }
    if let Some(event_id) = event.event_id.as_deref().filter(|id| !id.is_empty()) {
        push(&mut fields, "eventId", event_id);
    }

    match &event.body {
        EventBody::CommandRejected {
            command_kind,
            reject_reason,
        } => {
            push(&mut fields, "commandKind", command_kind.as_str());
            push(&mut fields, "rejectReason", reject_reason.as_str());
        }
        EventBody::Trade { book_seq, payload } => {
            push(&mut fields, "bookSeq", book_seq.to_string());
            push(&mut fields, "takerOrderId", payload.taker_order_id.as_str());
            push(&mut fields, "makerOrderId", payload.maker_order_id.as_str());
            push(&mut fields, "price", payload.price.to_string());
            push(&mut fields, "qty", payload.qty.to_string());
            push(&mut fields, "takerSide", payload.taker_side.as_str());
        }
        EventBody::BookDelta { book_seq, payload } => {
            push(&mut fields, "bookSeq", book_seq.to_string());
            push(&mut fields, "deltaType", payload.delta_type().as_str());
            encode_delta(&mut fields, payload);
        }
    }

    fields
}

fn encode_delta(fields: &mut StreamFields, delta: &BookDelta) {
    match delta {
        BookDelta::Add {
            order_id,
            side,
            price,
            qty,
        } => {
            push(fields, "orderId", order_id.as_str());
            push(fields, "side", side.as_str());
            push(fields, "price", price.to_string());
            push(fields, "qty", qty.to_string());
        }
        BookDelta::Fill {
            maker_order_id,
            taker_order_id,
            price,
            qty,
        } => {
            push(fields, "makerOrderId", maker_order_id.as_str());
            push(fields, "takerOrderId", taker_order_id.as_str());
            push(fields, "price", price.to_string());
            push(fields, "qty", qty.to_string());
        }
        BookDelta::Cancel { order_id } => {
            push(fields, "orderId", order_id.as_str());
        }
    }
}

/// Decode an event record; the first failing check wins
pub fn decode_event(fields: &FieldMap) -> DecodeResult<EventEnvelope> {
    check_version(fields)?;

    let market = read_non_empty(fields, "market").ok_or(DecodeError::MissingMarket)?;
    let kind = read_field(fields, "kind")
        .and_then(EventKind::parse)
        .ok_or(DecodeError::InvalidEventKind)?;

    let body = match kind {
        EventKind::CommandRejected => decode_rejection(fields)?,
        EventKind::Trade => {
            let book_seq = decode_book_seq(fields)?;
            EventBody::Trade {
                book_seq,
                payload: decode_trade(fields)?,
            }
        }
        EventKind::BookDelta => {
            let book_seq = decode_book_seq(fields)?;
            EventBody::BookDelta {
                book_seq,
                payload: decode_delta(fields)?,
            }
        }
    };

    Ok(EventEnvelope {
        market: market.to_string(),
        command_id: read_non_empty(fields, "commandId").map(str::to_string),
        event_id: read_non_empty(fields, "eventId").map(str::to_string),
        body,
    })
}

fn decode_book_seq(fields: &FieldMap) -> DecodeResult<u128> {
    parse_canonical_decimal(read_field(fields, "bookSeq")).ok_or(DecodeError::MissingOrInvalidBookSeq)
}

fn decode_rejection(fields: &FieldMap) -> DecodeResult<EventBody> {
    let command_kind = read_field(fields, "commandKind")
        .and_then(CommandKind::parse)
        .ok_or(DecodeError::InvalidCommandKind)?;
    let reason = read_non_empty(fields, "rejectReason").ok_or(DecodeError::MissingRejectReason)?;
    let reject_reason = RejectReason::parse(reason).ok_or(DecodeError::InvalidRejectReason)?;

    Ok(EventBody::CommandRejected {
        command_kind,
        reject_reason,
    })
}

fn decode_trade(fields: &FieldMap) -> DecodeResult<TradePayload> {
    let taker_order_id =
        read_non_empty(fields, "takerOrderId").ok_or(DecodeError::MissingTakerOrderId)?;
    let maker_order_id =
        read_non_empty(fields, "makerOrderId").ok_or(DecodeError::MissingMakerOrderId)?;
    let price = parse_canonical_decimal(read_field(fields, "price")).ok_or(DecodeError::InvalidPrice)?;
    let qty = parse_canonical_decimal(read_field(fields, "qty")).ok_or(DecodeError::InvalidQty)?;
    let taker_side = read_field(fields, "takerSide")
        .and_then(Side::parse)
        .ok_or(DecodeError::InvalidTakerSide)?;

    Ok(TradePayload {
        taker_order_id: taker_order_id.to_string(),
        maker_order_id: maker_order_id.to_string(),
        price,
        qty,
        taker_side,
    })
}

fn decode_delta(fields: &FieldMap) -> DecodeResult<BookDelta> {
    let delta_type = read_field(fields, "deltaType")
        .and_then(DeltaType::parse)
        .ok_or(DecodeError::InvalidDeltaType)?;

    let delta = match delta_type {
        DeltaType::Add => {
            let order_id = read_non_empty(fields, "orderId").ok_or(DecodeError::MissingOrderId)?;
            let side = read_field(fields, "side")
                .and_then(Side::parse)
                .ok_or(DecodeError::InvalidSide)?;
            let price =
                parse_canonical_decimal(read_field(fields, "price")).ok_or(DecodeError::InvalidPrice)?;
            let qty = parse_canonical_decimal(read_field(fields, "qty")).ok_or(DecodeError::InvalidQty)?;
            BookDelta::Add {
                order_id: order_id.to_string(),
                side,
                price,
                qty,
            }
        }
        DeltaType::Fill => {
            let maker_order_id =
                read_non_empty(fields, "makerOrderId").ok_or(DecodeError::MissingMakerOrderId)?;
            let taker_order_id =
                read_non_empty(fields, "takerOrderId").ok_or(DecodeError::MissingTakerOrderId)?;
            let price =
                parse_canonical_decimal(read_field(fields, "price")).ok_or(DecodeError::InvalidPrice)?;
            let qty = parse_canonical_decimal(read_field(fields, "qty")).ok_or(DecodeError::InvalidQty)?;
            BookDelta::Fill {
                maker_order_id: maker_order_id.to_string(),
                taker_order_id: taker_order_id.to_string(),
                price,
                qty,
            }
        }
        DeltaType::Cancel => {
            let order_id = read_non_empty(fields, "orderId").ok_or(DecodeError::MissingOrderId)?;
            BookDelta::Cancel {
                order_id: order_id.to_string(),
            }
        }
    };

    Ok(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn to_map(fields: StreamFields) -> FieldMap {
        fields.into_iter().collect()
    }

    fn trade() -> EventEnvelope {
        EventEnvelope::trade(
            "TATA-INR",
            3,
            TradePayload {
                taker_order_id: "b1".into(),
                maker_order_id: "s1".into(),
                price: 100,
                qty: 5,
                taker_side: Side::Buy,
            },
        )
        .with_command_id("cmd-3")
    }

    fn fill_delta() -> EventEnvelope {
        EventEnvelope::book_delta(
            "TATA-INR",
            3,
            BookDelta::Fill {
                maker_order_id: "s1".into(),
                taker_order_id: "b1".into(),
                price: 100,
                qty: 5,
            },
        )
    }

    #[test]
    fn test_round_trip_each_shape() {
        let events = vec![
            trade(),
            fill_delta(),
            EventEnvelope::book_delta(
                "TATA-INR",
                4,
                BookDelta::Add {
                    order_id: "b2".into(),
                    side: Side::Buy,
                    price: 99,
                    qty: 10,
                },
            ),
            EventEnvelope::book_delta(
                "TATA-INR",
                5,
                BookDelta::Cancel {
                    order_id: "b2".into(),
                },
            )
            .with_event_id("1700000000000-0"),
            EventEnvelope::rejected("TATA-INR", CommandKind::PlaceLimit, RejectReason::InvalidQty)
                .with_command_id("cmd-9"),
        ];

        for event in events {
            let decoded = decode_event(&to_map(encode_event(&event)));
            assert_eq!(decoded.as_ref(), Ok(&event));
        }
    }

    #[test]
    fn test_trade_field_order() {
        let keys: Vec<_> = encode_event(&trade()).into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                "v",
                "market",
                "kind",
                "commandId",
                "bookSeq",
                "takerOrderId",
                "makerOrderId",
                "price",
                "qty",
                "takerSide"
            ]
        );
    }

    #[test]
    fn test_rejection_has_no_book_seq_field() {
        let event =
            EventEnvelope::rejected("TATA-INR", CommandKind::Cancel, RejectReason::MarketMismatch);
        let fields = encode_event(&event);

        assert!(fields.iter().all(|(k, _)| k != "bookSeq"));
        assert!(fields.contains(&("rejectReason".into(), "MARKET_MISMATCH".into())));
        assert!(fields.contains(&("commandKind".into(), "CANCEL".into())));
    }

    #[test]
    fn test_absent_ids_are_not_emitted() {
        let fields = encode_event(&fill_delta());
        assert!(fields.iter().all(|(k, _)| k != "commandId" && k != "eventId"));
    }

    #[test]
    fn test_empty_ids_normalise_to_absent() {
        let event = fill_delta().with_command_id("").with_event_id("");
        let fields = encode_event(&event);
        assert_eq!(fields, encode_event(&fill_delta()));

        let decoded = decode_event(&to_map(fields)).unwrap();
        assert_eq!(decoded.command_id, None);
        assert_eq!(decoded.event_id, None);
        assert_eq!(decoded, fill_delta());
    }

    #[test]
    fn test_invalid_kind_and_market() {
        let mut fields = to_map(encode_event(&trade()));
        fields.insert("kind".into(), "ORDER_PLACED".into());
        assert_eq!(decode_event(&fields), Err(DecodeError::InvalidEventKind));

        fields.remove("market");
        assert_eq!(decode_event(&fields), Err(DecodeError::MissingMarket));
    }

    #[test]
    fn test_book_seq_checked_before_payload() {
        let mut fields = to_map(encode_event(&trade()));
        fields.insert("bookSeq".into(), "007".into());
        fields.remove("takerOrderId");
        assert_eq!(decode_event(&fields), Err(DecodeError::MissingOrInvalidBookSeq));
    }

    #[test]
    fn test_trade_payload_reasons() {
        let cases = [
            ("takerOrderId", DecodeError::MissingTakerOrderId),
            ("makerOrderId", DecodeError::MissingMakerOrderId),
            ("price", DecodeError::InvalidPrice),
            ("qty", DecodeError::InvalidQty),
            ("takerSide", DecodeError::InvalidTakerSide),
        ];

        for (key, expected) in cases {
            let mut fields = to_map(encode_event(&trade()));
            fields.remove(key);
            assert_eq!(decode_event(&fields), Err(expected), "missing {key}");
        }
    }

    #[test]
    fn test_fill_checks_maker_before_taker() {
        let mut fields = to_map(encode_event(&fill_delta()));
        fields.remove("makerOrderId");
        fields.remove("takerOrderId");
        assert_eq!(decode_event(&fields), Err(DecodeError::MissingMakerOrderId));
    }

    #[test]
    fn test_invalid_delta_type() {
        let mut fields = to_map(encode_event(&fill_delta()));
        fields.insert("deltaType".into(), "MODIFY".into());
        assert_eq!(decode_event(&fields), Err(DecodeError::InvalidDeltaType));
    }

    #[test]
    fn test_rejection_reasons() {
        let event =
            EventEnvelope::rejected("TATA-INR", CommandKind::Cancel, RejectReason::SeqOutOfOrder);

        let mut fields = to_map(encode_event(&event));
        fields.insert("rejectReason".into(), "".into());
        assert_eq!(decode_event(&fields), Err(DecodeError::MissingRejectReason));

        fields.insert("rejectReason".into(), "TOO_LATE".into());
        assert_eq!(decode_event(&fields), Err(DecodeError::InvalidRejectReason));

        fields.insert("commandKind".into(), "MARKET".into());
        assert_eq!(decode_event(&fields), Err(DecodeError::InvalidCommandKind));
    }

    #[test]
    fn test_injected_event_id_is_read() {
        let mut fields = to_map(encode_event(&fill_delta()));
        fields.insert("eventId".into(), "1-0".into());

        let event = decode_event(&fields).unwrap();
        assert_eq!(event.event_id.as_deref(), Some("1-0"));
        assert_matches!(event.body, EventBody::BookDelta { book_seq: 3, .. });
    }

    #[test]
    fn test_unsupported_version() {
        let mut fields = to_map(encode_event(&trade()));
        fields.insert("v".into(), "0".into());
        assert_eq!(decode_event(&fields), Err(DecodeError::UnsupportedVersion));
    }
}
