//! User preferences and credential storage
//!
//! Preferences are a flat JSON object kept in the user's home directory.
//! Secret values never land in that file: they go through a [`SecretStore`],
//! backed by the platform keyring.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::warn;

use crate::config::{KEYRING_SERVICE, PREFS_FILE_NAME};

/// Keys that must never be written to the preferences file.
const SECRET_KEYS: &[&str] = &["password", "secret_key", "minio_secret_key"];

#[derive(Debug, Clone, Default)]
pub struct Preferences {
    values: BTreeMap<String, Value>,
}

impl Preferences {
    /// Load preferences from `path`. A missing or unreadable file yields the
    /// defaults; a broken preferences file should never block a submission.
    pub fn load(path: &Path) -> Self {
        let values = std::fs::read_to_string(path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_else(|| {
                if path.exists() {
                    warn!("could not parse {}, using defaults", path.display());
                }
                BTreeMap::new()
            });
        Self { values }
    }

    /// Write preferences to `path`, dropping secret-bearing keys.
    pub fn save(&self, path: &Path) -> Result<()> {
        let safe: BTreeMap<&String, &Value> = self
            .values
            .iter()
            .filter(|(key, _)| !SECRET_KEYS.contains(&key.as_str()))
            .collect();
        let raw = serde_json::to_string_pretty(&safe)?;
        std::fs::write(path, raw)
            .with_context(|| format!("writing preferences to {}", path.display()))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }
}

/// Default preferences location: `~/.labsend_config.json`.
pub fn default_prefs_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PREFS_FILE_NAME)
}

/// Credential storage keyed by what the secret is for and who it belongs to.
pub trait SecretStore {
    fn get(&self, purpose: &str, principal: &str) -> Result<Option<String>>;
    fn set(&self, purpose: &str, principal: &str, secret: &str) -> Result<()>;
    fn delete(&self, purpose: &str, principal: &str) -> Result<()>;
}

/// Platform-keyring backed secret store.
pub struct KeyringSecretStore;

impl KeyringSecretStore {
    fn entry(purpose: &str, principal: &str) -> Result<keyring::Entry> {
        let user = format!("{purpose}:{principal}");
        keyring::Entry::new(KEYRING_SERVICE, &user)
            .with_context(|| format!("opening keyring entry for {user}"))
    }
}

impl SecretStore for KeyringSecretStore {
    fn get(&self, purpose: &str, principal: &str) -> Result<Option<String>> {
        match Self::entry(purpose, principal)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("reading secret from keyring"),
        }
    }

    fn set(&self, purpose: &str, principal: &str, secret: &str) -> Result<()> {
        Self::entry(purpose, principal)?
            .set_password(secret)
            .context("storing secret in keyring")
    }

    fn delete(&self, purpose: &str, principal: &str) -> Result<()> {
        match Self::entry(purpose, principal)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("removing secret from keyring"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let prefs = Preferences::load(&dir.path().join("nope.json"));
        assert!(prefs.get("anything").is_none());
    }

    #[test]
    fn test_load_garbage_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{not json").unwrap();
        let prefs = Preferences::load(&path);
        assert!(prefs.get("anything").is_none());
    }

    #[test]
    fn test_save_strips_secret_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");

        let mut prefs = Preferences::default();
        prefs.set("mongo_host", json!("db.example.org"));
        prefs.set("password", json!("hunter2"));
        prefs.set("secret_key", json!("abc123"));
        prefs.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("mongo_host"));
        assert!(!raw.contains("hunter2"));
        assert!(!raw.contains("abc123"));

        let reloaded = Preferences::load(&path);
        assert_eq!(reloaded.get_str("mongo_host"), Some("db.example.org"));
        assert!(reloaded.get("password").is_none());
    }

    #[test]
    fn test_round_trip_preserves_non_secret_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");

        let mut prefs = Preferences::default();
        prefs.set("mongo_port", json!(27017));
        prefs.set("use_tls", json!(true));
        prefs.save(&path).unwrap();

        let reloaded = Preferences::load(&path);
        assert_eq!(reloaded.get("mongo_port"), Some(&json!(27017)));
        assert_eq!(reloaded.get("use_tls"), Some(&json!(true)));
    }
}
