//! Field-level helpers shared by the command and event codecs

use std::collections::HashMap;

/// Encoded record: ordered (field, value) pairs
pub type StreamFields = Vec<(String, String)>;

/// Decoded record as read back from the log; key order is irrelevant
pub type FieldMap = HashMap<String, String>;

/// Value of the `v` field on every record written by this crate
pub const WIRE_VERSION: &str = "1";

/// Longest accepted decimal string
pub const MAX_DECIMAL_LEN: usize = 36;

/// Canonical base-10 form: digits only, no leading zero unless the value
/// is exactly "0", at most [`MAX_DECIMAL_LEN`] characters.
pub fn is_canonical_decimal(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_DECIMAL_LEN {
        return false;
    }
    if bytes[0] == b'0' {
        return bytes.len() == 1;
    }
    bytes.iter().all(u8::is_ascii_digit)
}

/// Parse a canonical decimal; `None` for a missing or non-canonical field
pub fn parse_canonical_decimal(value: Option<&str>) -> Option<u128> {
    let value = value?;
    if !is_canonical_decimal(value) {
        return None;
    }
    value.parse().ok()
}

/// Read a field that must be present and non-empty
pub fn read_non_empty<'a>(fields: &'a FieldMap, key: &str) -> Option<&'a str> {
    fields.get(key).map(String::as_str).filter(|v| !v.is_empty())
}

/// Read an optional field
pub fn read_field<'a>(fields: &'a FieldMap, key: &str) -> Option<&'a str> {
    fields.get(key).map(String::as_str)
}

pub(crate) fn push(fields: &mut StreamFields, key: &str, value: impl Into<String>) {
    fields.push((key.to_string(), value.into()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_decimal_accepts() {
        for ok in ["0", "1", "10", "100", "999999999999999999999999999999999999"] {
            assert!(is_canonical_decimal(ok), "{ok} should be canonical");
        }
    }

    #[test]
    fn test_canonical_decimal_rejects() {
        for bad in [
            "", "00", "01", "0100", "+5", "-5", " 5", "5 ", "1e3", "1.0", "0x10", "１",
            "1000000000000000000000000000000000000",
        ] {
            assert!(!is_canonical_decimal(bad), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_parse_canonical_decimal() {
        assert_eq!(parse_canonical_decimal(Some("0")), Some(0));
        assert_eq!(parse_canonical_decimal(Some("12345")), Some(12345));
        assert_eq!(parse_canonical_decimal(Some("007")), None);
        assert_eq!(parse_canonical_decimal(None), None);
    }

    #[test]
    fn test_read_non_empty() {
        let mut fields = FieldMap::new();
        fields.insert("a".into(), "x".into());
        fields.insert("b".into(), "".into());

        assert_eq!(read_non_empty(&fields, "a"), Some("x"));
        assert_eq!(read_non_empty(&fields, "b"), None);
        assert_eq!(read_non_empty(&fields, "c"), None);
        assert_eq!(read_field(&fields, "b"), Some(""));
    }
}
