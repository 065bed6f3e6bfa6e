use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrefsError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("type mismatch for key '{key}': expected {expected}, found {found:?}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: String,
    },

    #[error("malformed string set for key '{key}': {reason}")]
    Decode { key: String, reason: String },

    #[error("encode error: {0}")]
    Encode(String),

    #[error("invalid key: {0:?}")]
    InvalidKey(String),

    #[error("value for key '{key}' is too long ({len} chars)")]
    ValueTooLong { key: String, len: usize },

    #[error("invalid node: {0:?}")]
    InvalidNode(String),
}

pub(crate) fn storage<E: std::fmt::Display>(e: E) -> PrefsError {
    PrefsError::Storage(e.to_string())
}
