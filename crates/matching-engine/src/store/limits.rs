//! Argument limits shared by all log stores

use super::traits::{StoreError, StoreResult};
use crate::codec::StreamFields;

/// Largest batch a consumer-group read may request
pub const MAX_GROUP_READ_COUNT: usize = 1000;
/// Largest batch a tailing read may request
pub const MAX_TAIL_READ_COUNT: usize = 5000;
/// Longest a read may block
pub const MAX_BLOCK_MS: u64 = 60_000;
/// Most (field, value) pairs in one record
pub const MAX_FIELDS: usize = 64;

pub fn check_count(count: usize, max: usize) -> StoreResult<usize> {
    if count == 0 {
        return Err(StoreError::InvalidArgument {
            name: "count",
            reason: "must be at least 1".to_string(),
        });
    }
    if count > max {
        return Err(StoreError::InvalidArgument {
            name: "count",
            reason: format!("{} exceeds {}", count, max),
        });
    }
    Ok(count)
}

pub fn check_block_ms(block_ms: u64) -> StoreResult<u64> {
    if block_ms > MAX_BLOCK_MS {
        return Err(StoreError::InvalidArgument {
            name: "block_ms",
            reason: format!("{} exceeds {}", block_ms, MAX_BLOCK_MS),
        });
    }
    Ok(block_ms)
}

/// Validate a record and flatten it to `[k1, v1, k2, v2, ...]`
pub fn flatten_fields(fields: &StreamFields) -> StoreResult<Vec<&str>> {
    if fields.is_empty() {
        return Err(StoreError::InvalidFields("record has no fields"));
    }
    if fields.len() > MAX_FIELDS {
        return Err(StoreError::InvalidFields("record has too many fields"));
    }

    let mut flat = Vec::with_capacity(fields.len() * 2);
    for (key, value) in fields {
        if key.is_empty() {
            return Err(StoreError::InvalidFields("field key is empty"));
        }
        flat.push(key.as_str());
        flat.push(value.as_str());
    }
    Ok(flat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_count_bounds() {
        assert_matches!(check_count(0, MAX_GROUP_READ_COUNT), Err(StoreError::InvalidArgument { .. }));
        assert_eq!(check_count(1, MAX_GROUP_READ_COUNT).unwrap(), 1);
        assert_eq!(check_count(1000, MAX_GROUP_READ_COUNT).unwrap(), 1000);
        assert!(check_count(1001, MAX_GROUP_READ_COUNT).is_err());
        assert!(check_count(5000, MAX_TAIL_READ_COUNT).is_ok());
        assert!(check_count(5001, MAX_TAIL_READ_COUNT).is_err());
    }

    #[test]
    fn test_block_bounds() {
        assert!(check_block_ms(0).is_ok());
        assert!(check_block_ms(60_000).is_ok());
        assert!(check_block_ms(60_001).is_err());
    }

    #[test]
    fn test_flatten_fields() {
        let fields = vec![("a".to_string(), "1".to_string()), ("b".to_string(), "".to_string())];
        assert_eq!(flatten_fields(&fields).unwrap(), vec!["a", "1", "b", ""]);
    }

    #[test]
    fn test_flatten_rejects_bad_records() {
        assert_matches!(flatten_fields(&vec![]), Err(StoreError::InvalidFields(_)));

        let empty_key = vec![("".to_string(), "x".to_string())];
        assert_matches!(flatten_fields(&empty_key), Err(StoreError::InvalidFields(_)));

        let too_many: StreamFields = (0..65).map(|i| (format!("k{i}"), "v".to_string())).collect();
        assert_matches!(flatten_fields(&too_many), Err(StoreError::InvalidFields(_)));

        let max: StreamFields = (0..64).map(|i| (format!("k{i}"), "v".to_string())).collect();
        assert!(flatten_fields(&max).is_ok());
    }
}
