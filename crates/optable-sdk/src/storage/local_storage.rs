//! Passport and targeting cache scoped to one sandbox.

use std::sync::Arc;

use base64::Engine;
use serde_json::{Map, Value};

use super::KeyValueStore;
use crate::config::Config;
use crate::error::{OptableError, Result};

/// Targeting key/values as returned by the edge.
pub type TargetingData = Map<String, Value>;

const KEY_PREFIX: &str = "OPTABLE";

/// Derive the storage key for a sandbox: `base64(host + "/" + app)`.
pub fn storage_key(config: &Config) -> String {
    base64::engine::general_purpose::STANDARD.encode(format!("{}/{}", config.host, config.app))
}

/// Scoped view over a [`KeyValueStore`] holding one passport and one
/// targeting payload.
#[derive(Clone)]
pub struct LocalStorage {
    store: Arc<dyn KeyValueStore>,
    passport_key: String,
    targeting_key: String,
}

impl std::fmt::Debug for LocalStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStorage")
            .field("passport_key", &self.passport_key)
            .field("targeting_key", &self.targeting_key)
            .finish_non_exhaustive()
    }
}

impl LocalStorage {
    pub fn new(config: &Config, store: Arc<dyn KeyValueStore>) -> Self {
        let key = storage_key(config);
        Self {
            store,
            passport_key: format!("{KEY_PREFIX}_PASS_{key}"),
            targeting_key: format!("{KEY_PREFIX}_TGT_{key}"),
        }
    }

    /// Backend key under which the passport is stored.
    pub fn passport_key(&self) -> &str {
        &self.passport_key
    }

    /// Backend key under which the targeting payload is stored.
    pub fn targeting_key(&self) -> &str {
        &self.targeting_key
    }

    pub fn get_passport(&self) -> Result<Option<String>> {
        match self.store.get(&self.passport_key)? {
            None => Ok(None),
            Some(Value::String(passport)) => Ok(Some(passport)),
            Some(other) => Err(OptableError::InvalidFileFormat(format!(
                "passport entry is not a string: {}",
                json_kind(&other)
            ))),
        }
    }

    /// Overwrite the stored passport unconditionally.
    pub fn set_passport(&self, passport: &str) -> Result<()> {
        self.store
            .set(&self.passport_key, Value::String(passport.to_string()))
    }

    pub fn get_targeting(&self) -> Result<Option<TargetingData>> {
        match self.store.get(&self.targeting_key)? {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(OptableError::InvalidFileFormat(format!(
                "targeting entry is not an object: {}",
                json_kind(&other)
            ))),
        }
    }

    /// Replace the cached targeting payload wholesale.
    pub fn set_targeting(&self, keyvalues: &TargetingData) -> Result<()> {
        self.store
            .set(&self.targeting_key, Value::Object(keyvalues.clone()))
    }

    pub fn clear_targeting(&self) -> Result<()> {
        self.store.remove(&self.targeting_key)
    }

    /// Run `op` on the blocking thread pool.
    ///
    /// Backends may do file I/O and fsync; async callers go through here so
    /// runtime worker threads never wait on the disk.
    pub async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&LocalStorage) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || op(&storage))
            .await
            .map_err(|e| OptableError::StorageError(format!("storage task failed: {e}")))?
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
