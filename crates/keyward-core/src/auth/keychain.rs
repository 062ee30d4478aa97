use keyring::Entry;
use serde_json::Value;

use super::storage::{StorageError, StorageScope};

/// Durable scope kept in the OS keychain, one entry per field.
pub struct KeyringScope {
    service: String,
}

impl KeyringScope {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, StorageError> {
        Ok(Entry::new(&self.service, key)?)
    }
}

impl StorageScope for KeyringScope {
    /// Read a field from the OS keychain
    fn read(&self, key: &str) -> Result<Option<Value>, StorageError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(Value::String(value))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Store a field in the OS keychain
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entry(key)?.set_password(value)?;
        Ok(())
    }

    /// Delete a stored field; a missing entry counts as deleted
    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
