//! The study/break timer: persisted record, state machine, startup recovery.

mod machine;
mod phase;
mod recovery;

pub use machine::{TickOutcome, TimerMachine, TimerOptions, TimerStatus};
pub use phase::{Phase, TimerRecord};
pub use recovery::{recover, RecoveryOutcome};
