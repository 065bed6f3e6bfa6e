use std::path::PathBuf;

/// Default node every namespace is created under.
pub const DEFAULT_ROOT_NODE: &str = "app/prefs";

/// Where preferences live on disk and how namespaces map to store nodes.
///
/// Host binaries parse this from their command line and hand it to
/// `PreferencesRoot::open`.
#[derive(Debug, Clone)]
pub struct PrefsConfig {
    /// Directory holding the preferences database.
    pub data_dir: Option<PathBuf>,

    /// Path to the redb database file.
    /// Defaults to `{data_dir}/prefs.redb` if not specified.
    pub db_path: Option<PathBuf>,

    /// Node under which each namespace gets its own child node.
    pub root_node: String,
}

impl Default for PrefsConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            db_path: None,
            root_node: DEFAULT_ROOT_NODE.to_string(),
        }
    }
}

impl PrefsConfig {
    /// Parse configuration from command-line arguments.
    ///
    /// Supported flags:
    /// - `--data-dir=PATH`
    /// - `--db=PATH`
    /// - `--root-node=NODE`
    ///
    /// Anything else is left for the host to interpret.
    pub fn from_args(args: &[String]) -> Self {
        let mut config = PrefsConfig::default();

        for arg in args {
            if let Some(val) = arg.strip_prefix("--data-dir=") {
                config.data_dir = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--db=") {
                config.db_path = Some(PathBuf::from(val));
            } else if let Some(val) = arg.strip_prefix("--root-node=") {
                config.root_node = val.trim_matches('/').to_string();
            }
        }

        config
    }

    /// Resolve the database path, falling back to `{data_dir}/prefs.redb`.
    pub fn resolve_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| {
            self.data_dir
                .as_ref()
                .map(|d| d.join("prefs.redb"))
                .unwrap_or_else(|| PathBuf::from("prefs.redb"))
        })
    }

    /// Store node for a namespace: `{root_node}/{namespace}`.
    pub fn node_for(&self, namespace: &str) -> String {
        if self.root_node.is_empty() {
            namespace.to_string()
        } else {
            format!("{}/{}", self.root_node, namespace)
        }
    }
}
