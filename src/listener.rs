use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Callback type for store-level change notifications. Receives the changed key.
pub type ChangeHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Unique handle for a store subscription, returned by
/// `PreferenceStore::subscribe()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Clone)]
struct HandlerEntry {
    id: SubscriptionId,
    handler: ChangeHandler,
}

/// Per-node subscriber table shared by the store implementations.
///
/// Handlers are cloned out of the table before they run, so a handler may
/// subscribe, unsubscribe or read the store without deadlocking.
pub(crate) struct Watchers {
    nodes: RwLock<HashMap<String, Vec<HandlerEntry>>>,
    next_id: AtomicU64,
}

impl Watchers {
    pub(crate) fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn subscribe(&self, node: &str, handler: ChangeHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut nodes = self.nodes.write().unwrap_or_else(|e| e.into_inner());
        nodes
            .entry(node.to_string())
            .or_default()
            .push(HandlerEntry { id, handler });
        id
    }

    pub(crate) fn unsubscribe(&self, node: &str, id: SubscriptionId) -> bool {
        let mut nodes = self.nodes.write().unwrap_or_else(|e| e.into_inner());
        let Some(entries) = nodes.get_mut(node) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            nodes.remove(node);
        }
        removed
    }

    /// Call every handler of `node` once per key.
    pub(crate) fn notify<'a, I>(&self, node: &str, keys: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let handlers: Vec<ChangeHandler> = {
            let nodes = self.nodes.read().unwrap_or_else(|e| e.into_inner());
            match nodes.get(node) {
                Some(entries) => entries.iter().map(|e| e.handler.clone()).collect(),
                None => return,
            }
        };
        for key in keys {
            for handler in &handlers {
                handler(key);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn count(&self, node: &str) -> usize {
        let nodes = self.nodes.read().unwrap_or_else(|e| e.into_inner());
        nodes.get(node).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recorder() -> (ChangeHandler, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: ChangeHandler = Arc::new(move |key: &str| {
            sink.lock().unwrap().push(key.to_string());
        });
        (handler, seen)
    }

    #[test]
    fn notify_reaches_only_the_node() {
        let watchers = Watchers::new();
        let (handler, seen) = recorder();
        watchers.subscribe("a", handler);

        watchers.notify("a", ["k1", "k2"]);
        watchers.notify("b", ["other"]);

        assert_eq!(*seen.lock().unwrap(), vec!["k1", "k2"]);
    }

    #[test]
    fn ids_are_unique() {
        let watchers = Watchers::new();
        let (h, _) = recorder();
        let id1 = watchers.subscribe("a", h.clone());
        let id2 = watchers.subscribe("a", h);
        assert_ne!(id1, id2);
        assert_eq!(watchers.count("a"), 2);
    }

    #[test]
    fn unsubscribe_removes_handler() {
        let watchers = Watchers::new();
        let (handler, seen) = recorder();
        let id = watchers.subscribe("a", handler);

        assert!(watchers.unsubscribe("a", id));
        assert!(!watchers.unsubscribe("a", id));
        assert_eq!(watchers.count("a"), 0);

        watchers.notify("a", ["k"]);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn unsubscribe_wrong_node_is_noop() {
        let watchers = Watchers::new();
        let (handler, _) = recorder();
        let id = watchers.subscribe("a", handler);
        assert!(!watchers.unsubscribe("b", id));
        assert_eq!(watchers.count("a"), 1);
    }

    #[test]
    fn handler_may_unsubscribe_itself() {
        let watchers = Arc::new(Watchers::new());
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let w = watchers.clone();
        let s = slot.clone();
        let id = watchers.subscribe(
            "a",
            Arc::new(move |_key: &str| {
                if let Some(id) = s.lock().unwrap().take() {
                    w.unsubscribe("a", id);
                }
            }),
        );
        *slot.lock().unwrap() = Some(id);

        watchers.notify("a", ["k"]);
        assert_eq!(watchers.count("a"), 0);
    }

    #[test]
    fn subscription_id_display() {
        assert_eq!(SubscriptionId(7).to_string(), "sub-7");
    }
}
