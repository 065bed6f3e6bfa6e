//! String-set encoding.
//!
//! The backing store only holds text, so a set of strings is written as a
//! JSON array under its key: `["a","b"]`. Sets are unordered; the array is
//! emitted in sorted order because `BTreeSet` iterates that way.

use std::collections::BTreeSet;

use crate::error::PrefsError;

/// Encode a string set as a JSON array.
pub fn encode_string_set(values: &BTreeSet<String>) -> Result<String, PrefsError> {
    let list: Vec<&str> = values.iter().map(String::as_str).collect();
    serde_json::to_string(&list).map_err(|e| PrefsError::Encode(e.to_string()))
}

/// Decode a JSON array back into a set. Duplicates collapse; anything that
/// is not an array of strings is a `Decode` error for `key`.
pub fn decode_string_set(key: &str, raw: &str) -> Result<BTreeSet<String>, PrefsError> {
    let list: Vec<String> = serde_json::from_str(raw).map_err(|e| PrefsError::Decode {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    Ok(list.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn encodes_as_json_array() {
        assert_eq!(encode_string_set(&set(&["b", "a"])).unwrap(), r#"["a","b"]"#);
        assert_eq!(encode_string_set(&BTreeSet::new()).unwrap(), "[]");
    }

    #[test]
    fn awkward_members_survive() {
        let original = set(&["", "with \"quotes\"", "comma,separated", "ünïcödé", "[]"]);
        let encoded = encode_string_set(&original).unwrap();
        assert_eq!(decode_string_set("k", &encoded).unwrap(), original);
    }

    #[test]
    fn decode_ignores_order_and_duplicates() {
        let decoded = decode_string_set("k", r#"["z","a","z"]"#).unwrap();
        assert_eq!(decoded, set(&["a", "z"]));
    }

    #[test]
    fn malformed_is_an_error() {
        for raw in ["not json", r#"{"a":1}"#, "[1,2]", ""] {
            match decode_string_set("tags", raw) {
                Err(PrefsError::Decode { key, .. }) => assert_eq!(key, "tags"),
                other => panic!("{:?} decoded to {:?}", raw, other),
            }
        }
    }
}
