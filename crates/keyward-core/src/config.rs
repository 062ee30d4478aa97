//! Service configuration.
//!
//! Configuration is stored at `~/.config/keyward/config.json` and may be
//! overridden from the environment (or a `.env` file):
//!
//! - `KEYWARD_DURABLE_BACKEND`: `file` or `keyring`
//! - `KEYWARD_STORAGE_DIR`: directory for the durable credentials file
//! - `KEYWARD_HASH_ITERATIONS`, `KEYWARD_HASH_MEMORY_KIB`: login hash cost

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::HashCost;

/// Application name used for config/storage directory paths and the keychain service
pub const APP_NAME: &str = "keyward";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const ENV_DURABLE_BACKEND: &str = "KEYWARD_DURABLE_BACKEND";
const ENV_STORAGE_DIR: &str = "KEYWARD_STORAGE_DIR";
const ENV_HASH_ITERATIONS: &str = "KEYWARD_HASH_ITERATIONS";
const ENV_HASH_MEMORY_KIB: &str = "KEYWARD_HASH_MEMORY_KIB";

/// Where the durable scope lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurableBackend {
    #[default]
    File,
    Keyring,
}

impl FromStr for DurableBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(DurableBackend::File),
            "keyring" => Ok(DurableBackend::Keyring),
            other => Err(anyhow::anyhow!("Unknown durable backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub durable_backend: DurableBackend,
    pub storage_dir: Option<PathBuf>,
    pub hash: HashCost,
    pub user_agent: Option<String>,
    /// Send `Basic base64("null:null")` when logged out instead of no header
    pub null_identity_header: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            durable_backend: DurableBackend::default(),
            storage_dir: None,
            hash: HashCost::default(),
            user_agent: None,
            null_identity_header: true,
        }
    }
}

impl Config {
    /// Load from the default config path, falling back to defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Load the config file, then apply environment overrides.
    /// A `.env` file in the working directory is honored if present.
    pub fn from_env() -> Result<Self> {
        // Missing .env is fine
        let _ = dotenvy::dotenv();
        let mut config = Self::load()?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup(ENV_DURABLE_BACKEND) {
            self.durable_backend = backend.parse()?;
        }
        if let Some(dir) = lookup(ENV_STORAGE_DIR) {
            self.storage_dir = Some(PathBuf::from(dir));
        }
        if let Some(iterations) = lookup(ENV_HASH_ITERATIONS) {
            self.hash.iterations = iterations
                .trim()
                .parse()
                .with_context(|| format!("{} must be a positive integer", ENV_HASH_ITERATIONS))?;
        }
        if let Some(memory) = lookup(ENV_HASH_MEMORY_KIB) {
            self.hash.memory_kib = memory
                .trim()
                .parse()
                .with_context(|| format!("{} must be a positive integer", ENV_HASH_MEMORY_KIB))?;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.durable_backend, DurableBackend::File);
        assert_eq!(config.hash.iterations, 10);
        assert!(config.null_identity_header);
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"durable_backend": "keyring", "hash": {"iterations": 3}}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.durable_backend, DurableBackend::Keyring);
        assert_eq!(config.hash.iterations, 3);
        assert_eq!(config.hash.memory_kib, HashCost::default().memory_kib);
        assert!(config.null_identity_header);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            user_agent: Some("keyward-test".to_string()),
            null_identity_header: false,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_apply_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_DURABLE_BACKEND, "Keyring"),
            (ENV_STORAGE_DIR, "/tmp/keyward"),
            (ENV_HASH_ITERATIONS, " 4 "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.durable_backend, DurableBackend::Keyring);
        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/keyward")));
        assert_eq!(config.hash.iterations, 4);
    }

    #[test]
    fn test_apply_overrides_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config
            .apply_overrides(|key| (key == ENV_HASH_ITERATIONS).then(|| "many".to_string()))
            .is_err());
        assert!(config
            .apply_overrides(|key| (key == ENV_DURABLE_BACKEND).then(|| "cloud".to_string()))
            .is_err());
    }
}
