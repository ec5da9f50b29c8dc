//! TOML-based application configuration.
//!
//! Host-side knobs that the browser never sees:
//! - Wake cadence for the repeating tick
//! - Warning debounce window
//! - Hardware bridge endpoint
//! - Badge colors
//! - Log filter
//!
//! Configuration is stored at `<data_dir>/config.toml`. Study/break
//! durations are not here; they live in the key-value store.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_tick_interval")]
    pub tick_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_debounce")]
    pub debounce_secs: u64,
}

/// Local bridge that drives the desk hardware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeConfig {
    #[serde(default = "default_study_color")]
    pub study_color: String,
    #[serde(default = "default_break_color")]
    pub break_color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub hardware: HardwareConfig,
    #[serde(default)]
    pub badge: BadgeConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_tick_interval() -> u64 {
    30
}
fn default_debounce() -> u64 {
    10
}
fn default_endpoint() -> String {
    "http://localhost:5000/status".into()
}
fn default_timeout_ms() -> u64 {
    2_000
}
fn default_study_color() -> String {
    "#4CAF50".into()
}
fn default_break_color() -> String {
    "#2196F3".into()
}
fn default_log_filter() -> String {
    "info".into()
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            debounce_secs: default_debounce(),
        }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for BadgeConfig {
    fn default() -> Self {
        Self {
            study_color: default_study_color(),
            break_color: default_break_color(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl AppConfig {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let unknown = || ConfigError::UnknownKey(key.to_string());

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(format!("{e}")))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(unknown());
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or create the default file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_err = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_err(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_err(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_roundtrip() {
        let cfg = AppConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.timer.tick_interval_secs, 30);
        assert_eq!(parsed.hardware.endpoint, "http://localhost:5000/status");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: AppConfig = toml::from_str("[hardware]\nenabled = true\n").unwrap();
        assert!(parsed.hardware.enabled);
        assert_eq!(parsed.hardware.timeout_ms, 2_000);
        assert_eq!(parsed.monitor.debounce_secs, 10);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.get("hardware.enabled").as_deref(), Some("false"));
        assert_eq!(cfg.get("monitor.debounce_secs").as_deref(), Some("10"));
        assert_eq!(cfg.get("badge.break_color").as_deref(), Some("#2196F3"));
        assert!(cfg.get("hardware.missing").is_none());
        assert!(cfg.get("hardware").is_none());
    }

    #[test]
    fn set_updates_typed_values() {
        let mut cfg = AppConfig::default();
        cfg.set("hardware.enabled", "true").unwrap();
        cfg.set("timer.tick_interval_secs", "5").unwrap();
        cfg.set("log.filter", "debug").unwrap();
        assert!(cfg.hardware.enabled);
        assert_eq!(cfg.timer.tick_interval_secs, 5);
        assert_eq!(cfg.log.filter, "debug");
    }

    #[test]
    fn set_rejects_unknown_and_mistyped() {
        let mut cfg = AppConfig::default();
        assert!(matches!(
            cfg.set("hardware.nope", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            cfg.set("hardware.enabled", "maybe"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(cfg.set("hardware", "x").is_err());
    }

    #[test]
    fn load_from_creates_default_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = AppConfig::load_from(&path).unwrap();
        assert!(path.exists());
        assert!(!cfg.hardware.enabled);

        let mut changed = cfg.clone();
        changed.set("monitor.debounce_secs", "3").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap().monitor.debounce_secs, 3);
    }
}
