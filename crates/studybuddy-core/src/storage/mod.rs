//! Durable key-value storage.
//!
//! The persisted timer record, the user's durations and the allow-list all
//! live behind [`KvStore`]. Readers and the single writer go through the
//! same interface; there is no second cache to fall out of date after a
//! restart.

mod config;
mod file;
#[cfg(test)]
pub(crate) mod flaky;
mod memory;
pub mod settings;

pub use config::{AppConfig, BadgeConfig, HardwareConfig, LogConfig, MonitorConfig, TimerConfig};
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use settings::Settings;

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::{ConfigError, StorageError};

/// Snapshot or update of stored values.
pub type Map = BTreeMap<String, Value>;

pub mod keys {
    pub const PHASE: &str = "phase";
    pub const DEADLINE: &str = "deadline";
    pub const STUDY_DURATION: &str = "studyDuration";
    pub const BREAK_DURATION: &str = "breakDuration";
    pub const ALLOWED_WEBSITES: &str = "allowedWebsites";

    /// Keys written by earlier versions of the settings page.
    pub const LEGACY_STUDY_MINUTES: &str = "studyMinutes";
    pub const LEGACY_BREAK_MINUTES: &str = "breakMinutes";
}

/// Old and new value of a single key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueChange {
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// Keys changed by one `set` or `remove`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageChange {
    pub changes: BTreeMap<String, ValueChange>,
}

impl StorageChange {
    pub fn touches(&self, key: &str) -> bool {
        self.changes.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Asynchronous key-value store with change notifications.
///
/// `set` applies the whole mapping as one write: a reader never observes
/// half of it.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Returns the present keys among `keys`. Absent keys are omitted.
    async fn get(&self, keys: &[&str]) -> Result<Map, StorageError>;

    async fn set(&self, values: Map) -> Result<(), StorageError>;

    async fn remove(&self, keys: &[&str]) -> Result<(), StorageError>;

    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

/// Applies `values` to `data` and returns what actually changed.
pub(crate) fn apply_set(data: &mut Map, values: Map) -> StorageChange {
    let mut change = StorageChange::default();
    for (key, value) in values {
        let old = data.insert(key.clone(), value.clone());
        if old.as_ref() != Some(&value) {
            change.changes.insert(
                key,
                ValueChange {
                    old,
                    new: Some(value),
                },
            );
        }
    }
    change
}

pub(crate) fn apply_remove(data: &mut Map, keys: &[&str]) -> StorageChange {
    let mut change = StorageChange::default();
    for key in keys {
        if let Some(old) = data.remove(*key) {
            change.changes.insert(
                (*key).to_string(),
                ValueChange {
                    old: Some(old),
                    new: None,
                },
            );
        }
    }
    change
}

pub(crate) fn select(data: &Map, keys: &[&str]) -> Map {
    keys.iter()
        .filter_map(|k| data.get(*k).map(|v| ((*k).to_string(), v.clone())))
        .collect()
}

/// Returns the data directory.
///
/// `STUDYBUDDY_DATA_DIR` wins when set; otherwise `~/.config/studybuddy[-dev]/`
/// depending on `STUDYBUDDY_ENV`.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var("STUDYBUDDY_DATA_DIR") {
        Ok(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("STUDYBUDDY_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("studybuddy-dev")
            } else {
                base_dir.join("studybuddy")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
