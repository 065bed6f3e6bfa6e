use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use ::redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

use crate::error::{storage, PrefsError};
use crate::listener::{ChangeHandler, SubscriptionId, Watchers};
use crate::traits::{
    in_subtree, validate_batch, validate_key, validate_node, validate_value, PreferenceStore,
};

/// One table for every node; keys are `(node, key)` so a node's entries are
/// a contiguous, key-ordered range.
const TABLE: TableDefinition<(&str, &str), &str> = TableDefinition::new("prefs");

/// RedbStore is a PreferenceStore backed by redb, a pure-Rust embedded
/// key-value database. Writes are durable once the call returns.
///
/// Change notifications are process-local: handlers registered on this
/// instance see writes made through it (and through any clone of the `Arc`
/// holding it), not writes made by another process on the same file.
pub struct RedbStore {
    db: Arc<Database>,
    watchers: Watchers,
}

impl RedbStore {
    /// Open or create a redb database at the given path.
    pub fn open(path: &Path) -> Result<Self, PrefsError> {
        let db = Database::create(path).map_err(storage)?;

        // Ensure the table exists by doing a write transaction.
        let write_txn = db.begin_write().map_err(storage)?;
        {
            let _table = write_txn.open_table(TABLE).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;

        debug!("RedbStore: opened {:?}", path);
        Ok(Self {
            db: Arc::new(db),
            watchers: Watchers::new(),
        })
    }

    /// Every `(node, key)` pair in the subtree rooted at `node`.
    fn subtree_keys(
        table: &impl ReadableTable<(&'static str, &'static str), &'static str>,
        node: &str,
    ) -> Result<Vec<(String, String)>, PrefsError> {
        let mut keys = Vec::new();
        for entry in table.range((node, "")..).map_err(storage)? {
            let (key, _) = entry.map_err(storage)?;
            let (entry_node, entry_key) = key.value();
            // Siblings like "node-x" sort between "node" and "node/..." and
            // are skipped; the first name without the prefix ends the subtree.
            if !entry_node.starts_with(node) {
                break;
            }
            if in_subtree(entry_node, node) {
                keys.push((entry_node.to_string(), entry_key.to_string()));
            }
        }
        Ok(keys)
    }
}

impl PreferenceStore for RedbStore {
    fn get(&self, node: &str, key: &str) -> Result<Option<String>, PrefsError> {
        validate_node(node)?;
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(TABLE).map_err(storage)?;

        match table.get((node, key)) {
            Ok(Some(val)) => Ok(Some(val.value().to_string())),
            Ok(None) => Ok(None),
            Err(e) => Err(storage(e)),
        }
    }

    fn put(&self, node: &str, key: &str, value: &str) -> Result<(), PrefsError> {
        validate_node(node)?;
        validate_key(key)?;
        validate_value(key, value)?;

        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = write_txn.open_table(TABLE).map_err(storage)?;
            table.insert((node, key), value).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;

        self.watchers.notify(node, [key]);
        Ok(())
    }

    fn remove(&self, node: &str, key: &str) -> Result<(), PrefsError> {
        validate_node(node)?;

        let write_txn = self.db.begin_write().map_err(storage)?;
        let removed = {
            let mut table = write_txn.open_table(TABLE).map_err(storage)?;
            let old = table.remove((node, key)).map_err(storage)?;
            old.is_some()
        };
        write_txn.commit().map_err(storage)?;

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
        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = write_txn.open_table(TABLE).map_err(storage)?;
            for (key, value) in writes {
                match value {
                    Some(value) => {
                        table.insert((node, *key), *value).map_err(storage)?;
                        changed.push(*key);
                    }
                    None => {
                        let old = table.remove((node, *key)).map_err(storage)?;
                        if old.is_some() {
                            changed.push(*key);
                        }
                    }
                }
            }
        }
        // Dropping an uncommitted transaction aborts it, so an error above
        // leaves the node untouched.
        write_txn.commit().map_err(storage)?;

        debug!("RedbStore: wrote {} entries to {}", writes.len(), node);
        self.watchers.notify(node, changed);
        Ok(())
    }

    fn entries(&self, node: &str) -> Result<Vec<(String, String)>, PrefsError> {
        validate_node(node)?;
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(TABLE).map_err(storage)?;

        let mut results = Vec::new();
        for entry in table.range((node, "")..).map_err(storage)? {
            let (key, value) = entry.map_err(storage)?;
            let (entry_node, entry_key) = key.value();
            if entry_node != node {
                break;
            }
            results.push((entry_key.to_string(), value.value().to_string()));
        }

        Ok(results)
    }

    fn remove_node(&self, node: &str) -> Result<usize, PrefsError> {
        validate_node(node)?;

        let write_txn = self.db.begin_write().map_err(storage)?;
        let keys = {
            let mut table = write_txn.open_table(TABLE).map_err(storage)?;
            let keys = Self::subtree_keys(&table, node)?;
            for (entry_node, key) in &keys {
                table
                    .remove((entry_node.as_str(), key.as_str()))
                    .map_err(storage)?;
            }
            keys
        };
        write_txn.commit().map_err(storage)?;

        debug!("RedbStore: removed node {} ({} keys)", node, keys.len());
        let mut by_node: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (entry_node, key) in &keys {
            by_node
                .entry(entry_node.as_str())
                .or_default()
                .push(key.as_str());
        }
        for (entry_node, changed) in by_node {
            self.watchers.notify(entry_node, changed);
        }
        Ok(keys.len())
    }

    fn subscribe(&self, node: &str, handler: ChangeHandler) -> SubscriptionId {
        self.watchers.subscribe(node, handler)
    }

    fn unsubscribe(&self, node: &str, id: SubscriptionId) -> bool {
        self.watchers.unsubscribe(node, id)
    }
}
