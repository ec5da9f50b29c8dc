//! Wake-up scheduling.
//!
//! The timer only asks for two things: "wake me every N seconds" and "wake
//! me at T". Neither is trusted. A wake may come late, twice, or not at
//! all; the machine re-derives everything from the stored deadline on
//! whatever event arrives next.

mod recording;
mod tokio_scheduler;

pub use recording::{Registration, RecordingScheduler};
pub use tokio_scheduler::TokioScheduler;

use serde::{Deserialize, Serialize};

/// Name of the repeating display/fallback wake.
pub const TICK: &str = "studybuddy.tick";
/// Name of the exact end-of-phase wake.
pub const PHASE_END: &str = "studybuddy.phase-end";

/// Delivered when a registration fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wake {
    pub name: String,
    pub fired_at: i64,
}

pub trait Scheduler: Send + Sync {
    /// Replaces any registration under `name` with a repeating one.
    fn schedule_repeating(&self, name: &str, interval_secs: u64);

    /// Replaces any registration under `name` with a single wake at `at_ms`.
    fn schedule_once(&self, name: &str, at_ms: i64);

    fn cancel(&self, name: &str);
}
