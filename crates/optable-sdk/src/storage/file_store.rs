//! Durable key/value backend: one JSON file per key.
//!
//! Each key is stored as `{base_dir}/{hex(key)}.json`. Hex-encoding keeps
//! base64 storage keys (which may contain `/`, `+` and `=`) safe as file
//! names.
//!
//! File format:
//! ```json
//! { "version": 1, "key": "OPTABLE_PASS_...", "value": ... }
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::KeyValueStore;
use crate::error::{OptableError, Result};

// ── File format constants ─────────────────────────────────────────────────────

const ENTRY_FILE_VERSION: u32 = 1;

// ── On-disk structure ─────────────────────────────────────────────────────────

/// Wrapper written to disk for each key.
#[derive(Debug, Serialize, Deserialize)]
struct EntryFile {
    /// Format version number.
    version: u32,
    /// The original (un-encoded) key.
    key: String,
    /// The stored value.
    value: Value,
}

// ── FileStore ─────────────────────────────────────────────────────────────────

/// Filesystem-backed key/value store.
///
/// Writes go to a temporary file in the same directory which is then renamed
/// over the target, so readers observe either the previous or the new value.
/// Concurrent writers to the same key are not coordinated: the last rename
/// wins.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    /// Create a new `FileStore` rooted at `base_dir`.
    ///
    /// The directory and any missing parents are created if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `OptableError::Io` if the directory cannot be created.
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        std::fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Root directory of this store.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Build the filesystem path for `key`: `{base_dir}/{hex(key)}.json`.
    fn entry_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", hex::encode(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.entry_path(key);

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(OptableError::Io(e)),
        };

        let file: EntryFile = serde_json::from_slice(&bytes).map_err(|e| {
            OptableError::InvalidFileFormat(format!(
                "failed to parse store entry {}: {e}",
                path.display()
            ))
        })?;

        if file.key != key {
            return Err(OptableError::InvalidFileFormat(format!(
                "store entry {} holds key {:?}, expected {:?}",
                path.display(),
                file.key,
                key
            )));
        }

        Ok(Some(file.value))
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        let file = EntryFile {
            version: ENTRY_FILE_VERSION,
            key: key.to_string(),
            value,
        };

        let json = serde_json::to_vec_pretty(&file)
            .map_err(|e| OptableError::SerializationError(e.to_string()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.base_dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.entry_path(key))
            .map_err(|e| OptableError::Io(e.error))?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OptableError::Io(e)),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
