//! Strict parsing of raw Redis stream replies
//!
//! `XREAD` / `XREADGROUP` reply shape:
//! `[[stream, [[id, [k1, v1, ...]], ...]], ...]`, or nil on timeout.
//!
//! The shape is checked strictly. Field contents are not: non-UTF-8 bytes
//! are decoded lossily and a deleted pending entry (`[id, nil]`) becomes a
//! record with no fields, so the codec rejects such records one at a time
//! instead of failing the whole read.

use redis::Value;

use super::traits::{StoreError, StoreResult, StreamRecord};
use crate::codec::FieldMap;

fn invalid(what: &str) -> StoreError {
    StoreError::InvalidReply(what.to_string())
}

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::Data(bytes) => String::from_utf8(bytes.clone()).ok(),
        Value::Status(s) => Some(s.clone()),
        _ => None,
    }
}

/// Field keys and values are data, not protocol: decode them lossily
fn as_field_string(value: &Value) -> Option<String> {
    match value {
        Value::Data(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::Status(s) => Some(s.clone()),
        _ => None,
    }
}

/// Parse a stream read reply into records, in reply order
pub fn parse_stream_read_reply(reply: &Value) -> StoreResult<Vec<StreamRecord>> {
    let streams = match reply {
        Value::Nil => return Ok(Vec::new()),
        Value::Bulk(streams) => streams,
        _ => return Err(invalid("expected array of streams")),
    };

    let mut records = Vec::new();
    for stream in streams {
        let entries = match stream {
            Value::Bulk(parts) if parts.len() == 2 => match &parts[1] {
                Value::Bulk(entries) => entries,
                _ => return Err(invalid("expected array of entries")),
            },
            _ => return Err(invalid("expected [stream, entries] pair")),
        };

        for entry in entries {
            let (id, raw_fields) = match entry {
                Value::Bulk(parts) if parts.len() == 2 => (&parts[0], &parts[1]),
                _ => return Err(invalid("expected [id, fields] pair")),
            };

            let id = as_string(id)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| invalid("entry id is not a non-empty string"))?;

            let raw_fields: &[Value] = match raw_fields {
                Value::Bulk(values) if values.len() % 2 == 0 => values.as_slice(),
                // Pending entry whose record was deleted with XDEL
                Value::Nil => &[],
                _ => return Err(invalid("entry fields are not an even-length array")),
            };

            let mut fields = FieldMap::with_capacity(raw_fields.len() / 2);
            for pair in raw_fields.chunks(2) {
                let key = as_field_string(&pair[0])
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| invalid("field key is not a non-empty string"))?;
                let value =
                    as_field_string(&pair[1]).ok_or_else(|| invalid("field value is not a string"))?;
                fields.insert(key, value);
            }

            records.push(StreamRecord { id, fields });
        }
    }

    Ok(records)
}

/// Parse an integer reply, accepting a canonical decimal string as well
pub fn parse_integer_reply(reply: &Value) -> StoreResult<i64> {
    match reply {
        Value::Int(n) => Ok(*n),
        other => {
            let s = as_string(other).ok_or_else(|| invalid("expected integer"))?;
            s.parse::<i64>()
                .ok()
                .filter(|n| n.to_string() == s)
                .ok_or_else(|| invalid("expected integer"))
        }
    }
}

/// Parse the id returned by `XADD`
pub fn parse_id_reply(reply: &Value) -> StoreResult<String> {
    as_string(reply)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| invalid("expected non-empty id"))
}

/// Parse the id out of an `XREVRANGE … COUNT 1` reply: `[[id, fields]]` or `[]`
pub fn parse_last_entry_reply(reply: &Value) -> StoreResult<Option<String>> {
    let entries = match reply {
        Value::Nil => return Ok(None),
        Value::Bulk(entries) => entries,
        _ => return Err(invalid("expected array of entries")),
    };

    match entries.first() {
        None => Ok(None),
        Some(Value::Bulk(parts)) if parts.len() == 2 => as_string(&parts[0])
            .filter(|id| !id.is_empty())
            .map(Some)
            .ok_or_else(|| invalid("entry id is not a non-empty string")),
        Some(_) => Err(invalid("expected [id, fields] pair")),
    }
}
