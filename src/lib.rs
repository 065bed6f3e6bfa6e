//! Mobile-style shared preferences on a desktop preferences store.
//!
//! [`SharedPreferences`] offers the familiar typed get / edit / commit /
//! listener interface; values are kept as text in a node of a
//! [`PreferenceStore`] ([`RedbStore`] on disk, [`MemoryStore`] in memory).
//!
//! ```ignore
//! let root = PreferencesRoot::open(&PrefsConfig::from_args(&args))?;
//! let prefs = root.shared_preferences("reader")?;
//!
//! prefs.register_on_change_listener("ui", |p: &SharedPreferences, key: &str| {
//!     println!("{} changed", key);
//! });
//! prefs.edit().put_int("page", 12).put_boolean("dark", true).commit();
//!
//! assert_eq!(prefs.get_int("page", 0)?, 12);
//! ```

pub mod codec;
pub mod config;
pub mod editor;
pub mod error;
pub mod listener;
pub mod memory;
pub mod redb;
pub mod root;
pub mod shared;
pub mod traits;
pub mod value;

pub use config::PrefsConfig;
pub use editor::{Editor, PendingWrite};
pub use error::PrefsError;
pub use listener::{ChangeHandler, SubscriptionId};
pub use memory::MemoryStore;
pub use crate::redb::RedbStore;
pub use root::PreferencesRoot;
pub use shared::{ListenerId, OnChangeListener, SharedPreferences};
pub use traits::{PreferenceStore, MAX_KEY_LENGTH, MAX_NAME_LENGTH, MAX_VALUE_LENGTH};
pub use value::{PrefValue, StoredValue};
