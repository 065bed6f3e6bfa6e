use std::collections::BTreeSet;

use crate::codec::encode_string_set;
use crate::error::PrefsError;

/// A value waiting in an editor batch.
#[derive(Debug, Clone, PartialEq)]
pub enum PrefValue {
    String(String),
    StringSet(BTreeSet<String>),
    Int(i32),
    Long(i64),
    Float(f32),
    Boolean(bool),
}

impl PrefValue {
    /// The text written to the backing store for this value.
    pub fn to_stored(&self) -> Result<String, PrefsError> {
        Ok(match self {
            PrefValue::String(s) => s.clone(),
            PrefValue::StringSet(set) => encode_string_set(set)?,
            PrefValue::Int(v) => v.to_stored(),
            PrefValue::Long(v) => v.to_stored(),
            PrefValue::Float(v) => v.to_stored(),
            PrefValue::Boolean(v) => v.to_stored(),
        })
    }
}

/// Scalar types with a canonical text form in the backing store.
pub trait StoredValue: Sized {
    const TYPE_NAME: &'static str;

    fn to_stored(&self) -> String;

    /// Parse stored text. None means the text is not a value of this type.
    fn from_stored(raw: &str) -> Option<Self>;

    /// Parse stored text for `key`, failing with `TypeMismatch`.
    fn parse_for(key: &str, raw: &str) -> Result<Self, PrefsError> {
        Self::from_stored(raw).ok_or_else(|| PrefsError::TypeMismatch {
            key: key.to_string(),
            expected: Self::TYPE_NAME,
            found: raw.to_string(),
        })
    }
}

impl StoredValue for String {
    const TYPE_NAME: &'static str = "string";

    fn to_stored(&self) -> String {
        self.clone()
    }

    fn from_stored(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl StoredValue for i32 {
    const TYPE_NAME: &'static str = "int";

    fn to_stored(&self) -> String {
        self.to_string()
    }

    fn from_stored(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl StoredValue for i64 {
    const TYPE_NAME: &'static str = "long";

    fn to_stored(&self) -> String {
        self.to_string()
    }

    fn from_stored(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl StoredValue for f32 {
    const TYPE_NAME: &'static str = "float";

    // Display prints the shortest text that parses back to the same f32.
    fn to_stored(&self) -> String {
        self.to_string()
    }

    fn from_stored(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl StoredValue for bool {
    const TYPE_NAME: &'static str = "boolean";

    fn to_stored(&self) -> String {
        self.to_string()
    }

    fn from_stored(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("true") {
            Some(true)
        } else if raw.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_use_plain_text() {
        assert_eq!(PrefValue::Int(-5).to_stored().unwrap(), "-5");
        assert_eq!(PrefValue::Long(i64::MAX).to_stored().unwrap(), "9223372036854775807");
        assert_eq!(PrefValue::Float(1.5).to_stored().unwrap(), "1.5");
        assert_eq!(PrefValue::Boolean(true).to_stored().unwrap(), "true");
        assert_eq!(PrefValue::String("x".into()).to_stored().unwrap(), "x");
    }

    #[test]
    fn sets_are_json() {
        let set: BTreeSet<String> = ["b".to_string(), "a".to_string()].into();
        assert_eq!(PrefValue::StringSet(set).to_stored().unwrap(), r#"["a","b"]"#);
    }

    #[test]
    fn floats_round_trip_exactly() {
        for v in [0.1f32, -3.4028235e38, f32::MIN_POSITIVE, 1.0 / 3.0, f32::INFINITY] {
            assert_eq!(f32::from_stored(&v.to_stored()), Some(v));
        }
        assert!(f32::from_stored("NaN").unwrap().is_nan());
    }

    #[test]
    fn booleans_ignore_case() {
        assert_eq!(bool::from_stored("TRUE"), Some(true));
        assert_eq!(bool::from_stored("False"), Some(false));
        assert_eq!(bool::from_stored("yes"), None);
        assert_eq!(bool::from_stored("1"), None);
    }

    #[test]
    fn int_out_of_range_is_mismatch() {
        let err = i32::parse_for("k", "9223372036854775807").unwrap_err();
        match err {
            PrefsError::TypeMismatch { key, expected, found } => {
                assert_eq!(key, "k");
                assert_eq!(expected, "int");
                assert_eq!(found, "9223372036854775807");
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(i64::parse_for("k", "9223372036854775807").unwrap(), i64::MAX);
    }

    #[test]
    fn integers_tolerate_whitespace() {
        assert_eq!(i32::from_stored(" 42 "), Some(42));
        assert_eq!(i32::from_stored("4.2"), None);
    }
}
