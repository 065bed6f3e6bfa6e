use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::codec::decode_string_set;
use crate::editor::Editor;
use crate::error::PrefsError;
use crate::listener::{ChangeHandler, SubscriptionId};
use crate::traits::{validate_node, PreferenceStore};
use crate::value::StoredValue;

/// Caller-chosen identity of a change listener.
///
/// Registering a second listener under the same id replaces the first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(String);

impl ListenerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ListenerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ListenerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Receives `(preferences, key)` whenever a key of the node changes.
///
/// Called on the thread that performed the write, after the write is visible.
/// Implemented for any `Fn(&SharedPreferences, &str)` closure.
pub trait OnChangeListener: Send + Sync {
    fn on_shared_preference_changed(&self, prefs: &SharedPreferences, key: &str);
}

impl<F> OnChangeListener for F
where
    F: Fn(&SharedPreferences, &str) + Send + Sync,
{
    fn on_shared_preference_changed(&self, prefs: &SharedPreferences, key: &str) {
        self(prefs, key)
    }
}

/// SharedPreferences is the typed key-value view of one store node.
///
/// Reads go straight to the store. Writes go through an [`Editor`] from
/// [`edit`](Self::edit). Values live in the store as text; typed getters
/// parse that text and fail with `TypeMismatch` when it does not fit, while
/// a missing key always yields the caller's default.
///
/// Clones share listener registrations. When the last clone is dropped its
/// listeners are unsubscribed from the store.
#[derive(Clone)]
pub struct SharedPreferences {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<dyn PreferenceStore>,
    node: String,
    listeners: Mutex<HashMap<ListenerId, SubscriptionId>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let listeners = self.listeners.get_mut().unwrap_or_else(|e| e.into_inner());
        for (_, sub) in listeners.drain() {
            self.store.unsubscribe(&self.node, sub);
        }
    }
}

impl SharedPreferences {
    /// Bind to `node` of `store`. The node need not exist yet.
    pub fn new(
        store: Arc<dyn PreferenceStore>,
        node: impl Into<String>,
    ) -> Result<Self, PrefsError> {
        let node = node.into();
        validate_node(&node)?;
        Ok(Self {
            inner: Arc::new(Inner {
                store,
                node,
                listeners: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// The store node this view reads and writes.
    pub fn node(&self) -> &str {
        &self.inner.node
    }

    /// Every key with its stored text.
    ///
    /// Typed values come back in the same form `get_string` returns for them
    /// (`"42"`, `"true"`, `["a","b"]`). Use the typed getters for real values.
    pub fn get_all(&self) -> Result<BTreeMap<String, String>, PrefsError> {
        Ok(self.inner.store.entries(&self.inner.node)?.into_iter().collect())
    }

    pub fn get_string(&self, key: &str, default: Option<&str>) -> Result<Option<String>, PrefsError> {
        match self.inner.store.get(&self.inner.node, key)? {
            Some(value) => Ok(Some(value)),
            None => Ok(default.map(str::to_string)),
        }
    }

    /// Decode a stored string set. A missing key returns `defaults` as given;
    /// a malformed stored value is a `Decode` error.
    pub fn get_string_set(
        &self,
        key: &str,
        defaults: Option<&BTreeSet<String>>,
    ) -> Result<Option<BTreeSet<String>>, PrefsError> {
        match self.inner.store.get(&self.inner.node, key)? {
            Some(raw) => decode_string_set(key, &raw).map(Some),
            None => Ok(defaults.cloned()),
        }
    }

    pub fn get_int(&self, key: &str, default: i32) -> Result<i32, PrefsError> {
        self.get_value(key, default)
    }

    pub fn get_long(&self, key: &str, default: i64) -> Result<i64, PrefsError> {
        self.get_value(key, default)
    }

    pub fn get_float(&self, key: &str, default: f32) -> Result<f32, PrefsError> {
        self.get_value(key, default)
    }

    pub fn get_boolean(&self, key: &str, default: bool) -> Result<bool, PrefsError> {
        self.get_value(key, default)
    }

    fn get_value<T: StoredValue>(&self, key: &str, default: T) -> Result<T, PrefsError> {
        match self.inner.store.get(&self.inner.node, key)? {
            Some(raw) => T::parse_for(key, &raw),
            None => Ok(default),
        }
    }

    pub fn contains(&self, key: &str) -> Result<bool, PrefsError> {
        self.inner.store.contains(&self.inner.node, key)
    }

    /// A fresh, empty editor for this node.
    pub fn edit(&self) -> Editor {
        Editor::new(self.inner.store.clone(), self.inner.node.clone())
    }

    /// Register `listener` under `id`, replacing any listener already there.
    ///
    /// The listener sees changes from every writer sharing the store, not
    /// just editors created from this value.
    pub fn register_on_change_listener<L>(&self, id: impl Into<ListenerId>, listener: L)
    where
        L: OnChangeListener + 'static,
    {
        let id = id.into();
        let listener = Arc::new(listener);
        let weak = Arc::downgrade(&self.inner);
        let handler: ChangeHandler = Arc::new(move |key: &str| {
            // The view may be gone by the time the store calls back.
            if let Some(inner) = weak.upgrade() {
                let prefs = SharedPreferences { inner };
                listener.on_shared_preference_changed(&prefs, key);
            }
        });

        let mut listeners = self.inner.listeners.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = listeners.remove(&id) {
            self.inner.store.unsubscribe(&self.inner.node, previous);
        }
        let sub = self.inner.store.subscribe(&self.inner.node, handler);
        debug!("SharedPreferences: listener {} on {} ({})", id, self.inner.node, sub);
        listeners.insert(id, sub);
    }

    /// Remove the listener registered under `id`. Returns false if there was none.
    pub fn unregister_on_change_listener(&self, id: impl Into<ListenerId>) -> bool {
        let id = id.into();
        let removed = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id);
        match removed {
            Some(sub) => self.inner.store.unsubscribe(&self.inner.node, sub),
            None => false,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Delete every key of this node from the store. Not undoable.
    pub fn delete_all(&self) -> Result<(), PrefsError> {
        let removed = self.inner.store.remove_node(&self.inner.node)?;
        debug!("SharedPreferences: deleted {} keys from {}", removed, self.inner.node);
        Ok(())
    }
}

impl fmt::Debug for SharedPreferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPreferences")
            .field("node", &self.inner.node)
            .field("listeners", &self.listener_count())
            .finish()
    }
}
