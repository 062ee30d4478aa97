//! Key-value storage scopes for persisted credentials.
//!
//! A scope stores the string fields [`FIELD_USER`] and [`FIELD_PASS`].
//! Values are kept as raw JSON so that a scope written by something else
//! (or hand-edited) can hold non-string values; those are treated as
//! "not hydratable" by the credential store rather than coerced.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

/// Field holding the username in a scope
pub const FIELD_USER: &str = "user";

/// Field holding the password hash in a scope
pub const FIELD_PASS: &str = "pass";

/// Durable credentials file name
const CREDENTIALS_FILE: &str = "credentials.json";

/// Which of the two persistence scopes a value lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Survives process restarts
    Durable,
    /// Lives as long as the process
    Ephemeral,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::Durable => f.write_str("durable"),
            ScopeKind::Ephemeral => f.write_str("ephemeral"),
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Credentials file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("No {0} directory available on this platform")]
    NoDirectory(&'static str),
}

/// A named key-value store backing one persistence scope.
pub trait StorageScope: Send + Sync {
    /// Read the raw value stored under `key`, if any
    fn read(&self, key: &str) -> Result<Option<Value>, StorageError>;

    /// Store a string value under `key`
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// ============================================================================
// In-memory scope
// ============================================================================

/// Process-lifetime scope; the ephemeral scope by default.
#[derive(Debug, Default)]
pub struct MemoryScope {
    values: RwLock<HashMap<String, Value>>,
}

impl MemoryScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an arbitrary JSON value, bypassing the string-only `write`
    pub fn set_value(&self, key: &str, value: Value) {
        self.values.write().insert(key.to_string(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl StorageScope for MemoryScope {
    fn read(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.values.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.set_value(key, Value::String(value.to_string()));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.write().remove(key);
        Ok(())
    }
}

// ============================================================================
// JSON file scope
// ============================================================================

/// Durable scope backed by a single JSON object on disk.
pub struct FileScope {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileScope {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// File scope in `dir`, or in the platform config directory when `dir` is `None`
    pub fn in_dir(dir: Option<&Path>, app_name: &str) -> Result<Self, StorageError> {
        let dir = match dir {
            Some(dir) => dir.to_path_buf(),
            None => dirs::config_dir()
                .ok_or(StorageError::NoDirectory("config"))?
                .join(app_name),
        };
        Ok(Self::new(dir.join(CREDENTIALS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, StorageError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&contents).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, map: &Map<String, Value>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let contents = serde_json::to_string_pretty(map).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, contents).map_err(io_err)?;
        debug!(path = %self.path.display(), "Credentials file written");
        Ok(())
    }
}

impl StorageScope for FileScope {
    fn read(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let _guard = self.lock.lock();
        Ok(self.load()?.remove(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut map = self.load()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.save(&map)
    }

    /// A corrupt file holds nothing readable, so removing any key discards it
    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut map = match self.load() {
            Ok(map) => map,
            Err(StorageError::Corrupt { path, source }) => {
                warn!(path = %path.display(), error = %source, "Discarding corrupt credentials file");
                return std::fs::remove_file(&self.path).map_err(|source| StorageError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
            Err(e) => return Err(e),
        };
        if map.remove(key).is_some() {
            self.save(&map)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_scope_write_read_remove() {
        let scope = MemoryScope::new();
        assert!(scope.read(FIELD_USER).unwrap().is_none());

        scope.write(FIELD_USER, "alice").unwrap();
        assert_eq!(scope.read(FIELD_USER).unwrap(), Some(json!("alice")));

        scope.remove(FIELD_USER).unwrap();
        assert!(scope.read(FIELD_USER).unwrap().is_none());
        // Removing twice is fine
        scope.remove(FIELD_USER).unwrap();
    }

    #[test]
    fn test_file_scope_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let scope = FileScope::in_dir(Some(dir.path()), "keyward").unwrap();
        scope.write(FIELD_USER, "bob").unwrap();
        scope.write(FIELD_PASS, "hash").unwrap();

        let reopened = FileScope::in_dir(Some(dir.path()), "keyward").unwrap();
        assert_eq!(reopened.read(FIELD_USER).unwrap(), Some(json!("bob")));
        assert_eq!(reopened.read(FIELD_PASS).unwrap(), Some(json!("hash")));
    }

    #[test]
    fn test_file_scope_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let scope = FileScope::new(dir.path().join("nested").join("creds.json"));
        assert!(scope.read(FIELD_USER).unwrap().is_none());
        scope.remove(FIELD_USER).unwrap();
        assert!(!scope.path().exists());
    }

    #[test]
    fn test_file_scope_keeps_non_string_values_raw() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(&path, r#"{"user": 42}"#).unwrap();

        let scope = FileScope::new(&path);
        assert_eq!(scope.read(FIELD_USER).unwrap(), Some(json!(42)));
    }

    #[test]
    fn test_file_scope_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(&path, "not json").unwrap();

        let scope = FileScope::new(&path);
        assert!(matches!(
            scope.read(FIELD_USER),
            Err(StorageError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_file_scope_remove_discards_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(&path, "garbage").unwrap();

        let scope = FileScope::new(&path);
        scope.remove(FIELD_USER).unwrap();
        assert!(!path.exists());
        assert!(scope.read(FIELD_USER).unwrap().is_none());
        // Already gone
        scope.remove(FIELD_PASS).unwrap();
    }

    #[test]
    fn test_scope_kind_display() {
        assert_eq!(ScopeKind::Durable.to_string(), "durable");
        assert_eq!(ScopeKind::Ephemeral.to_string(), "ephemeral");
    }
}
