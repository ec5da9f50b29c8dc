use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::Phase;

/// Why a phase was (re)started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartReason {
    /// No record existed.
    ColdStart,
    /// The previous phase's deadline passed.
    Transition,
    /// Durations changed; the current phase restarted.
    ConfigurationChanged,
    /// User asked for a fresh study period.
    Reset,
}

/// Every timer state change produces an event.
/// The popup and other collaborators subscribe to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TimerEvent {
    PhaseStarted {
        phase: Phase,
        deadline: i64,
        duration_ms: i64,
        reason: StartReason,
        at: DateTime<Utc>,
    },
    /// A deadline was reached and the machine moved on.
    PhaseCompleted {
        from: Phase,
        to: Phase,
        /// How far past the deadline the transition ran.
        overdue_ms: i64,
        at: DateTime<Utc>,
    },
    /// Process start found a phase still in progress.
    Resumed {
        phase: Phase,
        deadline: i64,
        remaining_min: u64,
        at: DateTime<Utc>,
    },
    Tick {
        phase: Phase,
        remaining_min: u64,
        at: DateTime<Utc>,
    },
    SiteWarning {
        tab_id: i64,
        url: String,
        at: DateTime<Utc>,
    },
}

/// Epoch milliseconds to a UTC timestamp, clamped to the epoch on overflow.
pub(crate) fn at(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
