use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::StorageError;
use crate::storage::{keys, KvStore, Map};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Study,
    Break,
}

impl Phase {
    /// The phase that follows this one when its deadline passes.
    pub fn next(self) -> Phase {
        match self {
            Phase::Study => Phase::Break,
            Phase::Break => Phase::Study,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Study => "study",
            Phase::Break => "break",
        }
    }

    fn parse(s: &str) -> Option<Phase> {
        match s {
            "study" => Some(Phase::Study),
            "break" => Some(Phase::Break),
            _ => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single persisted timer entity.
///
/// `phase` and `deadline` are always written together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRecord {
    pub phase: Phase,
    /// Epoch milliseconds at which `phase` ends.
    pub deadline: i64,
}

impl TimerRecord {
    pub fn new(phase: Phase, deadline: i64) -> Self {
        Self { phase, deadline }
    }

    pub fn to_map(&self) -> Map {
        let mut map = Map::new();
        map.insert(keys::PHASE.into(), Value::from(self.phase.as_str()));
        map.insert(keys::DEADLINE.into(), Value::from(self.deadline));
        map
    }

    /// Reads the record back out of a snapshot.
    ///
    /// Both keys absent is "no timer". Anything else that is not a
    /// well-formed pair is also treated as absent, with a warning, so the
    /// caller falls through to a cold start instead of running on half a
    /// record.
    pub fn from_map(map: &Map) -> Option<Self> {
        let phase = map.get(keys::PHASE);
        let deadline = map.get(keys::DEADLINE);
        match (phase, deadline) {
            (None, None) => None,
            (Some(p), Some(d)) => {
                let phase = p.as_str().and_then(Phase::parse);
                let deadline = d.as_i64().or_else(|| d.as_f64().map(|f| f as i64));
                match (phase, deadline) {
                    (Some(phase), Some(deadline)) => Some(Self { phase, deadline }),
                    _ => {
                        warn!(phase = %p, deadline = %d, "malformed timer record ignored");
                        None
                    }
                }
            }
            _ => {
                warn!("timer record has only one of phase/deadline, ignored");
                None
            }
        }
    }

    pub async fn load(store: &dyn KvStore) -> Result<Option<Self>, StorageError> {
        let map = store.get(&[keys::PHASE, keys::DEADLINE]).await?;
        Ok(Self::from_map(&map))
    }

    pub async fn save(&self, store: &dyn KvStore) -> Result<(), StorageError> {
        store.set(self.to_map()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn next_alternates() {
        assert_eq!(Phase::Study.next(), Phase::Break);
        assert_eq!(Phase::Break.next(), Phase::Study);
    }

    #[test]
    fn map_round_trip() {
        let record = TimerRecord::new(Phase::Break, 1_700_000_123_456);
        assert_eq!(TimerRecord::from_map(&record.to_map()), Some(record));
    }

    #[test]
    fn half_records_are_absent() {
        let mut map = Map::new();
        map.insert("phase".into(), json!("study"));
        assert_eq!(TimerRecord::from_map(&map), None);

        map.insert("deadline".into(), json!("tomorrow"));
        assert_eq!(TimerRecord::from_map(&map), None);

        let mut map = Map::new();
        map.insert("phase".into(), json!("nap"));
        map.insert("deadline".into(), json!(5));
        assert_eq!(TimerRecord::from_map(&map), None);
    }
}
