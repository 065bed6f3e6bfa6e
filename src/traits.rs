use crate::error::PrefsError;
use crate::listener::{ChangeHandler, SubscriptionId};

/// Longest key a store accepts, in characters.
pub const MAX_KEY_LENGTH: usize = 80;

/// Longest stored value a store accepts, in characters.
pub const MAX_VALUE_LENGTH: usize = 8192;

/// Longest single `/`-separated node name, in characters.
pub const MAX_NAME_LENGTH: usize = 80;

/// PreferenceStore is the node-scoped persistence layer underneath
/// `SharedPreferences`.
///
/// A node is a `/`-separated path such as `app/prefs/reader`. Each node holds
/// its own string key-value namespace; values are always stored as text and
/// typed views are built on top. Implementations must notify the node's
/// subscribers once per changed key after the change is visible to readers.
pub trait PreferenceStore: Send + Sync {
    /// Get the stored text for a key. Returns None if the key does not exist.
    fn get(&self, node: &str, key: &str) -> Result<Option<String>, PrefsError>;

    /// Store a value, replacing any previous one.
    fn put(&self, node: &str, key: &str, value: &str) -> Result<(), PrefsError>;

    /// Delete a key. Deleting an absent key is not an error.
    fn remove(&self, node: &str, key: &str) -> Result<(), PrefsError>;

    /// Apply several writes at once. `None` deletes the key.
    /// Either every write is applied or none is.
    fn write_batch(
        &self,
        node: &str,
        writes: &[(&str, Option<&str>)],
    ) -> Result<(), PrefsError>;

    /// All (key, value) pairs of a node, sorted by key.
    fn entries(&self, node: &str) -> Result<Vec<(String, String)>, PrefsError>;

    /// Delete every key of a node and of all its descendants (`node/...`).
    /// Each affected node notifies its own subscribers. Returns the number of
    /// keys removed.
    fn remove_node(&self, node: &str) -> Result<usize, PrefsError>;

    /// Register a handler called with the key of every change in `node`.
    fn subscribe(&self, node: &str, handler: ChangeHandler) -> SubscriptionId;

    /// Remove a handler. Returns false if it was not registered.
    fn unsubscribe(&self, node: &str, id: SubscriptionId) -> bool;

    /// All keys of a node, sorted.
    fn keys(&self, node: &str) -> Result<Vec<String>, PrefsError> {
        Ok(self.entries(node)?.into_iter().map(|(k, _)| k).collect())
    }

    fn contains(&self, node: &str, key: &str) -> Result<bool, PrefsError> {
        Ok(self.get(node, key)?.is_some())
    }
}

/// A node path is one or more non-empty names joined by `/`: no leading,
/// trailing or doubled separators.
pub(crate) fn validate_node(node: &str) -> Result<(), PrefsError> {
    let bad_name = |name: &str| {
        name.is_empty() || name.chars().count() > MAX_NAME_LENGTH || name.contains('\0')
    };
    if node.split('/').any(bad_name) {
        return Err(PrefsError::InvalidNode(node.to_string()));
    }
    Ok(())
}

/// True if `candidate` is `node` itself or one of its descendants.
pub(crate) fn in_subtree(candidate: &str, node: &str) -> bool {
    match candidate.strip_prefix(node) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

pub(crate) fn validate_key(key: &str) -> Result<(), PrefsError> {
    if key.chars().count() > MAX_KEY_LENGTH || key.contains('\0') {
        return Err(PrefsError::InvalidKey(key.to_string()));
    }
    Ok(())
}

pub(crate) fn validate_value(key: &str, value: &str) -> Result<(), PrefsError> {
    let len = value.chars().count();
    if len > MAX_VALUE_LENGTH {
        return Err(PrefsError::ValueTooLong {
            key: key.to_string(),
            len,
        });
    }
    Ok(())
}

/// Validate a whole batch before anything is written.
pub(crate) fn validate_batch(
    node: &str,
    writes: &[(&str, Option<&str>)],
) -> Result<(), PrefsError> {
    validate_node(node)?;
    for (key, value) in writes {
        validate_key(key)?;
        if let Some(value) = value {
            validate_value(key, value)?;
        }
    }
    Ok(())
}
