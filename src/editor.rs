use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::PrefsError;
use crate::traits::PreferenceStore;
use crate::value::PrefValue;

/// One buffered change in an editor batch.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingWrite {
    Put(PrefValue),
    /// Delete the key, including a value persisted before this batch.
    Remove,
}

/// Editor buffers writes for one node and flushes them on `commit`/`apply`.
///
/// The batch is private to the editor: nothing is visible to readers until
/// a flush succeeds. A later write to the same key replaces an earlier one.
/// Dropping an editor without flushing discards the batch.
///
/// ```ignore
/// prefs.edit()
///     .put_int("font_size", 14)
///     .put_string("theme", Some("dark"))
///     .commit();
/// ```
pub struct Editor {
    store: Arc<dyn PreferenceStore>,
    node: String,
    pending: BTreeMap<String, PendingWrite>,
}

impl Editor {
    pub(crate) fn new(store: Arc<dyn PreferenceStore>, node: String) -> Self {
        Self {
            store,
            node,
            pending: BTreeMap::new(),
        }
    }

    fn put(&mut self, key: &str, value: PrefValue) -> &mut Self {
        self.pending
            .insert(key.to_string(), PendingWrite::Put(value));
        self
    }

    /// `None` is the same as `remove(key)`.
    pub fn put_string(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        match value {
            Some(value) => self.put(key, PrefValue::String(value.to_string())),
            None => self.remove(key),
        }
    }

    /// `None` is the same as `remove(key)`.
    pub fn put_string_set(&mut self, key: &str, values: Option<BTreeSet<String>>) -> &mut Self {
        match values {
            Some(values) => self.put(key, PrefValue::StringSet(values)),
            None => self.remove(key),
        }
    }

    pub fn put_int(&mut self, key: &str, value: i32) -> &mut Self {
        self.put(key, PrefValue::Int(value))
    }

    pub fn put_long(&mut self, key: &str, value: i64) -> &mut Self {
        self.put(key, PrefValue::Long(value))
    }

    pub fn put_float(&mut self, key: &str, value: f32) -> &mut Self {
        self.put(key, PrefValue::Float(value))
    }

    pub fn put_boolean(&mut self, key: &str, value: bool) -> &mut Self {
        self.put(key, PrefValue::Boolean(value))
    }

    /// Cancel any pending put for `key` and delete its persisted value on flush.
    pub fn remove(&mut self, key: &str) -> &mut Self {
        self.pending.insert(key.to_string(), PendingWrite::Remove);
        self
    }

    /// Discard the whole pending batch. Persisted values are not touched.
    pub fn clear(&mut self) -> &mut Self {
        self.pending.clear();
        self
    }

    /// The pending change for `key`, if any.
    pub fn pending(&self, key: &str) -> Option<&PendingWrite> {
        self.pending.get(key)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Flush the batch, reporting failures to the caller.
    ///
    /// On error nothing is written and the batch is kept, so the call can be
    /// retried.
    pub fn try_commit(&mut self) -> Result<(), PrefsError> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let count = {
            let mut encoded: Vec<(&str, Option<String>)> = Vec::with_capacity(self.pending.len());
            for (key, write) in &self.pending {
                let value = match write {
                    PendingWrite::Put(value) => Some(value.to_stored()?),
                    PendingWrite::Remove => None,
                };
                encoded.push((key.as_str(), value));
            }

            let writes: Vec<(&str, Option<&str>)> = encoded
                .iter()
                .map(|(key, value)| (*key, value.as_deref()))
                .collect();
            self.store.write_batch(&self.node, &writes)?;
            writes.len()
        };

        self.pending.clear();
        debug!("Editor: flushed {} entries to {}", count, self.node);
        Ok(())
    }

    /// Flush the batch synchronously. Returns false if the flush failed.
    pub fn commit(&mut self) -> bool {
        match self.try_commit() {
            Ok(()) => true,
            Err(e) => {
                warn!("Editor: commit to {} failed: {}", self.node, e);
                false
            }
        }
    }

    /// Flush the batch without reporting the outcome.
    ///
    /// Runs on the calling thread, so a later commit or apply from the same
    /// editor always lands after this one.
    pub fn apply(&mut self) {
        if let Err(e) = self.try_commit() {
            warn!("Editor: apply to {} failed: {}", self.node, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::traits::MAX_KEY_LENGTH;

    fn editor() -> (Arc<MemoryStore>, Editor) {
        let store = Arc::new(MemoryStore::new());
        let editor = Editor::new(store.clone(), "n".to_string());
        (store, editor)
    }

    #[test]
    fn last_write_wins_in_batch() {
        let (store, mut editor) = editor();
        editor.put_int("k", 5).put_int("k", 9);
        assert_eq!(editor.pending_len(), 1);
        assert!(editor.commit());
        assert_eq!(store.get("n", "k").unwrap(), Some("9".to_string()));
    }

    #[test]
    fn nothing_visible_before_flush() {
        let (store, mut editor) = editor();
        editor.put_string("k", Some("v"));
        assert_eq!(store.get("n", "k").unwrap(), None);
        editor.apply();
        assert_eq!(store.get("n", "k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn none_means_remove() {
        let (store, mut editor) = editor();
        store.put("n", "s", "old").unwrap();
        store.put("n", "set", "[]").unwrap();

        editor.put_string("s", None).put_string_set("set", None);
        assert_eq!(editor.pending("s"), Some(&PendingWrite::Remove));
        assert!(editor.commit());
        assert!(store.entries("n").unwrap().is_empty());
    }

    #[test]
    fn remove_cancels_pending_put() {
        let (store, mut editor) = editor();
        editor.put_int("k", 5).remove("k");
        assert!(editor.commit());
        assert_eq!(store.get("n", "k").unwrap(), None);
    }

    #[test]
    fn remove_deletes_persisted_value() {
        let (store, mut editor) = editor();
        store.put("n", "k", "1").unwrap();
        editor.remove("k");
        assert!(editor.commit());
        assert_eq!(store.get("n", "k").unwrap(), None);
    }

    #[test]
    fn clear_discards_batch_only() {
        let (store, mut editor) = editor();
        store.put("n", "kept", "1").unwrap();
        editor.put_int("a", 1).remove("kept").clear();
        assert_eq!(editor.pending_len(), 0);
        assert!(editor.commit());
        assert_eq!(store.keys("n").unwrap(), vec!["kept"]);
    }

    #[test]
    fn batch_emptied_after_commit() {
        let (store, mut editor) = editor();
        editor.put_int("a", 1);
        assert!(editor.commit());

        store.put("n", "a", "2").unwrap();
        // A second commit must not replay the first batch.
        assert!(editor.commit());
        assert_eq!(store.get("n", "a").unwrap(), Some("2".to_string()));
    }

    #[test]
    fn failed_commit_keeps_batch() {
        let (store, mut editor) = editor();
        let long_key = "k".repeat(MAX_KEY_LENGTH + 1);
        editor.put_int("ok", 1).put_int(&long_key, 2);

        assert!(matches!(editor.try_commit(), Err(PrefsError::InvalidKey(_))));
        assert!(!editor.commit());
        assert_eq!(editor.pending_len(), 2);
        assert_eq!(store.get("n", "ok").unwrap(), None);

        editor.clear().put_int("ok", 1);
        editor.apply();
        assert_eq!(store.get("n", "ok").unwrap(), Some("1".to_string()));
    }

    #[test]
    fn flush_writes_each_type() {
        let (store, mut editor) = editor();
        let tags: BTreeSet<String> = ["x".to_string(), "y".to_string()].into();
        editor
            .put_string("s", Some("text"))
            .put_string_set("set", Some(tags))
            .put_int("i", -1)
            .put_long("l", 1 << 40)
            .put_float("f", 0.25)
            .put_boolean("b", false);
        assert!(editor.commit());

        let entries: BTreeMap<String, String> = store.entries("n").unwrap().into_iter().collect();
        assert_eq!(entries["s"], "text");
        assert_eq!(entries["set"], r#"["x","y"]"#);
        assert_eq!(entries["i"], "-1");
        assert_eq!(entries["l"], "1099511627776");
        assert_eq!(entries["f"], "0.25");
        assert_eq!(entries["b"], "false");
    }

    #[test]
    fn empty_commit_succeeds() {
        let (_store, mut editor) = editor();
        assert!(editor.commit());
    }
}
