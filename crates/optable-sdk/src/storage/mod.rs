//! Persistent state for one sandbox: the visitor passport and the cached
//! targeting payload.
//!
//! State lives in a [`KeyValueStore`] backend. [`LocalStorage`] namespaces
//! its two keys by the storage key derived from `host + "/" + app`, so two
//! SDK instances for the same sandbox share state and different sandboxes
//! never collide.
//!
//! # Backends
//!
//! - [`memory_store`]: process-local map.
//! - [`file_store`]: one JSON file per key, survives restarts.
//!
//! An SDK built without a store uses [`default_store`], a single
//! process-wide backend, so instances for the same sandbox still share
//! their passport.
//!
//! ```text
//! {base_dir}/
//! ├── {hex(OPTABLE_PASS_<storage key>)}.json
//! └── {hex(OPTABLE_TGT_<storage key>)}.json
//! ```

pub mod file_store;
pub mod local_storage;
pub mod memory_store;

pub use file_store::FileStore;
pub use local_storage::{storage_key, LocalStorage, TargetingData};
pub use memory_store::MemoryStore;

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::config::ENV_STATE_DIR;
use crate::error::Result;

/// Directory for persisted visitor state when none is given explicitly:
/// `$OPTABLE_STATE_DIR`, else `~/.optable`.
pub fn default_state_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(ENV_STATE_DIR).filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|home| !home.is_empty())
        .map(|home| PathBuf::from(home).join(".optable"))
}

/// Backend shared by every SDK built without an explicit store.
///
/// Resolved once per process: a [`FileStore`] under [`default_state_dir`],
/// or a [`MemoryStore`] when that directory is unavailable.
pub fn default_store() -> Arc<dyn KeyValueStore> {
    static DEFAULT: OnceLock<Arc<dyn KeyValueStore>> = OnceLock::new();
    DEFAULT.get_or_init(open_default_store).clone()
}

fn open_default_store() -> Arc<dyn KeyValueStore> {
    match default_state_dir() {
        Some(dir) => match FileStore::new(&dir) {
            Ok(store) => {
                log::debug!("default visitor state directory: {}", dir.display());
                return Arc::new(store);
            }
            Err(e) => log::warn!(
                "cannot open state directory {}: {e}; visitor state will not survive restarts",
                dir.display()
            ),
        },
        None => log::warn!(
            "no state directory ({ENV_STATE_DIR} and HOME unset); visitor state will not survive restarts"
        ),
    }
    Arc::new(MemoryStore::new())
}

/// A narrow key/value persistence layer.
///
/// Each `set` replaces the whole value for a key atomically; there is no
/// read-modify-write across keys. Implementations should persist across
/// process restarts where the platform allows it.
pub trait KeyValueStore: Send + Sync {
    /// Get the value for `key`, or `None` if it was never set or was removed.
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Set the value for `key`, overwriting any previous value.
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove the entry for `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
