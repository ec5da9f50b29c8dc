//! User-set durations and the allow-list, kept in the key-value store.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::{keys, KvStore, Map};
use crate::error::{CoreError, StorageError, ValidationError};

pub const DEFAULT_STUDY_MINUTES: u32 = 25;
pub const DEFAULT_BREAK_MINUTES: u32 = 5;

/// Study and break durations in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(rename = "studyDuration")]
    pub study_minutes: u32,
    #[serde(rename = "breakDuration")]
    pub break_minutes: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            study_minutes: DEFAULT_STUDY_MINUTES,
            break_minutes: DEFAULT_BREAK_MINUTES,
        }
    }
}

/// Named presets offered by the settings page.
pub const PRESETS: &[(&str, Settings)] = &[
    ("classic", Settings { study_minutes: 25, break_minutes: 5 }),
    ("short", Settings { study_minutes: 15, break_minutes: 3 }),
    ("long", Settings { study_minutes: 50, break_minutes: 10 }),
    ("deep", Settings { study_minutes: 90, break_minutes: 20 }),
];

impl Settings {
    pub fn new(study_minutes: u32, break_minutes: u32) -> Self {
        Self {
            study_minutes,
            break_minutes,
        }
    }

    pub fn preset(name: &str) -> Option<Self> {
        PRESETS
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, s)| *s)
    }

    /// Checks the rules the settings form enforces.
    ///
    /// Study must be positive and the break may not exceed half of it.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.study_minutes == 0 {
            return Err(ValidationError::InvalidValue {
                field: keys::STUDY_DURATION.into(),
                message: "Study time must be greater than zero.".into(),
            });
        }
        // break * 2 <= study, without floats
        if u64::from(self.break_minutes) * 2 > u64::from(self.study_minutes) {
            return Err(ValidationError::BreakTooLong {
                study: self.study_minutes,
                brk: self.break_minutes,
            });
        }
        Ok(())
    }

    /// Parses durations out of a store snapshot.
    ///
    /// Missing keys take their defaults (or the legacy key when present);
    /// a value that is present but not a non-negative integer is an error.
    pub fn from_map(map: &Map) -> Result<Self, ValidationError> {
        let study = read_minutes(map, keys::STUDY_DURATION, keys::LEGACY_STUDY_MINUTES)?
            .unwrap_or(DEFAULT_STUDY_MINUTES);
        let brk = read_minutes(map, keys::BREAK_DURATION, keys::LEGACY_BREAK_MINUTES)?
            .unwrap_or(DEFAULT_BREAK_MINUTES);
        Ok(Self::new(study, brk))
    }

    pub fn to_map(&self) -> Map {
        let mut map = Map::new();
        map.insert(keys::STUDY_DURATION.into(), Value::from(self.study_minutes));
        map.insert(keys::BREAK_DURATION.into(), Value::from(self.break_minutes));
        map
    }

    /// Loads settings, falling back to defaults when the store cannot be
    /// read or holds garbage.
    pub async fn load(store: &dyn KvStore) -> Self {
        match Self::try_load(store).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "settings unreadable, using defaults");
                Self::default()
            }
        }
    }

    pub async fn try_load(store: &dyn KvStore) -> Result<Self, CoreError> {
        let map = store
            .get(&[
                keys::STUDY_DURATION,
                keys::BREAK_DURATION,
                keys::LEGACY_STUDY_MINUTES,
                keys::LEGACY_BREAK_MINUTES,
            ])
            .await?;
        let settings = Self::from_map(&map)?;
        if settings.study_minutes == 0 {
            // a zero study phase would spin the machine
            return Err(ValidationError::InvalidValue {
                field: keys::STUDY_DURATION.into(),
                message: "Study time must be greater than zero.".into(),
            }
            .into());
        }
        Ok(settings)
    }

    /// Validates and writes both durations in one store update.
    pub async fn save(&self, store: &dyn KvStore) -> Result<(), CoreError> {
        self.validate()?;
        store.set(self.to_map()).await?;
        Ok(())
    }

    /// Drops stored durations, legacy keys included, in one store update.
    pub async fn clear(store: &dyn KvStore) -> Result<(), StorageError> {
        store
            .remove(&[
                keys::STUDY_DURATION,
                keys::BREAK_DURATION,
                keys::LEGACY_STUDY_MINUTES,
                keys::LEGACY_BREAK_MINUTES,
            ])
            .await
    }

    pub fn duration_for(&self, phase: crate::timer::Phase) -> u32 {
        match phase {
            crate::timer::Phase::Study => self.study_minutes,
            crate::timer::Phase::Break => self.break_minutes,
        }
    }
}

fn read_minutes(map: &Map, key: &str, legacy: &str) -> Result<Option<u32>, ValidationError> {
    let Some(value) = map.get(key).or_else(|| map.get(legacy)) else {
        return Ok(None);
    };
    let minutes = match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            // whole-valued floats such as 25.0
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    minutes
        .and_then(|m| u32::try_from(m).ok())
        .map(Some)
        .ok_or_else(|| ValidationError::InvalidValue {
            field: key.to_string(),
            message: format!("expected whole minutes, got {value}"),
        })
}

/// Reads the allow-list. Non-string entries are skipped.
pub async fn load_allowed_websites(store: &dyn KvStore) -> Result<Vec<String>, StorageError> {
    let map = store.get(&[keys::ALLOWED_WEBSITES]).await?;
    let list = match map.get(keys::ALLOWED_WEBSITES) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    Ok(list)
}

/// Replaces the allow-list. Entries are trimmed and blanks dropped.
pub async fn save_allowed_websites(
    store: &dyn KvStore,
    sites: &[String],
) -> Result<Vec<String>, StorageError> {
    let cleaned: Vec<String> = sites
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let mut map = Map::new();
    map.insert(keys::ALLOWED_WEBSITES.into(), Value::from(cleaned.clone()));
    store.set(map).await?;
    Ok(cleaned)
}

pub async fn clear_allowed_websites(store: &dyn KvStore) -> Result<(), StorageError> {
    store.remove(&[keys::ALLOWED_WEBSITES]).await
}
