use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::PrefsError;
use crate::listener::{ChangeHandler, SubscriptionId, Watchers};
use crate::traits::{
    in_subtree, validate_batch, validate_key, validate_node, validate_value, PreferenceStore,
};

/// MemoryStore keeps every node in a process-local map.
///
/// Nothing survives the process. It behaves like `RedbStore` in every other
/// respect (validation, notifications) and is what the unit tests run on.
pub struct MemoryStore {
    nodes: RwLock<BTreeMap<String, BTreeMap<String, String>>>,
    watchers: Watchers,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(BTreeMap::new()),
            watchers: Watchers::new(),
        }
    }

}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, node: &str, key: &str) -> Result<Option<String>, PrefsError> {
        validate_node(node)?;
        let nodes = self.nodes.read().unwrap_or_else(|e| e.into_inner());
        Ok(nodes.get(node).and_then(|entries| entries.get(key).cloned()))
    }

    fn put(&self, node: &str, key: &str, value: &str) -> Result<(), PrefsError> {
        validate_node(node)?;
        validate_key(key)?;
        validate_value(key, value)?;
        {
            let mut nodes = self.nodes.write().unwrap_or_else(|e| e.into_inner());
            nodes
                .entry(node.to_string())
                .or_default()
                .insert(key.to_string(), value.to_string());
        }
        self.watchers.notify(node, [key]);
        Ok(())
    }

    fn remove(&self, node: &str, key: &str) -> Result<(), PrefsError> {
        validate_node(node)?;
        let removed = {
            let mut nodes = self.nodes.write().unwrap_or_else(|e| e.into_inner());
            let removed = nodes
                .get_mut(node)
                .and_then(|entries| entries.remove(key))
                .is_some();
            if nodes.get(node).is_some_and(BTreeMap::is_empty) {
                nodes.remove(node);
            }
            removed
        };
        if removed {
            self.watchers.notify(node, [key]);
        }
        Ok(())
    }

    fn write_batch(
        &self,
        node: &str,
        writes: &[(&str, Option<&str>)],
    ) -> Result<(), PrefsError> {
        validate_batch(node, writes)?;
        let mut changed = Vec::with_capacity(writes.len());
        {
            let mut nodes = self.nodes.write().unwrap_or_else(|e| e.into_inner());
            let entries = nodes.entry(node.to_string()).or_default();
            for (key, value) in writes {
                match value {
                    Some(value) => {
                        entries.insert(key.to_string(), value.to_string());
                        changed.push(*key);
                    }
                    None => {
                        if entries.remove(*key).is_some() {
                            changed.push(*key);
                        }
                    }
                }
            }
            if entries.is_empty() {
                nodes.remove(node);
            }
        }
        self.watchers.notify(node, changed);
        Ok(())
    }

    fn entries(&self, node: &str) -> Result<Vec<(String, String)>, PrefsError> {
        validate_node(node)?;
        let nodes = self.nodes.read().unwrap_or_else(|e| e.into_inner());
        Ok(nodes
            .get(node)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn remove_node(&self, node: &str) -> Result<usize, PrefsError> {
        validate_node(node)?;
        let removed: Vec<(String, BTreeMap<String, String>)> = {
            let mut nodes = self.nodes.write().unwrap_or_else(|e| e.into_inner());
            // Descendants share the `node` prefix, so they sit in one range.
            let doomed: Vec<String> = nodes
                .range(node.to_string()..)
                .take_while(|(name, _)| name.starts_with(node))
                .filter(|(name, _)| in_subtree(name, node))
                .map(|(name, _)| name.clone())
                .collect();
            doomed
                .into_iter()
                .filter_map(|name| nodes.remove(&name).map(|entries| (name, entries)))
                .collect()
        };

        let mut count = 0;
        for (name, entries) in &removed {
            count += entries.len();
            self.watchers.notify(name, entries.keys().map(String::as_str));
        }
        Ok(count)
    }

    fn subscribe(&self, node: &str, handler: ChangeHandler) -> SubscriptionId {
        self.watchers.subscribe(node, handler)
    }

    fn unsubscribe(&self, node: &str, id: SubscriptionId) -> bool {
        self.watchers.unsubscribe(node, id)
    }
}
