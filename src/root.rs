use std::sync::Arc;

use tracing::debug;

use crate::config::PrefsConfig;
use crate::error::{storage, PrefsError};
use crate::redb::RedbStore;
use crate::shared::SharedPreferences;
use crate::traits::PreferenceStore;

/// PreferencesRoot hands out `SharedPreferences` for named namespaces.
///
/// Every namespace becomes the node `{root_node}/{namespace}` of one shared
/// store, so all views of a namespace see each other's writes and listeners.
#[derive(Clone)]
pub struct PreferencesRoot {
    store: Arc<dyn PreferenceStore>,
    config: PrefsConfig,
}

impl PreferencesRoot {
    /// Open the redb database named by `config`, creating it if needed.
    pub fn open(config: &PrefsConfig) -> Result<Self, PrefsError> {
        let path = config.resolve_db_path();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(storage)?;
        }
        let store = RedbStore::open(&path)?;
        debug!("PreferencesRoot: {:?} under {}", path, config.root_node);
        Ok(Self::new(Arc::new(store), config.clone()))
    }

    /// Wrap an existing store.
    pub fn new(store: Arc<dyn PreferenceStore>, config: PrefsConfig) -> Self {
        Self { store, config }
    }

    /// The preferences of `namespace`, e.g. `"reader"` or `"source/42"`.
    pub fn shared_preferences(&self, namespace: &str) -> Result<SharedPreferences, PrefsError> {
        if namespace.is_empty() {
            return Err(PrefsError::InvalidNode(namespace.to_string()));
        }
        SharedPreferences::new(self.store.clone(), self.config.node_for(namespace))
    }
}
