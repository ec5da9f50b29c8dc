//! studybuddy-core: study/break timer with crash-safe recovery.
//!
//! - [`timer`]: the state machine, its persisted record and startup recovery
//! - [`storage`]: key-value store, user settings, app config
//! - [`scheduler`]: wake-up registrations (tokio-backed or recorded)
//! - [`monitor`]: off-list site warnings
//! - [`commands`]: popup/settings request handling
//! - [`service`]: the single dispatcher tying it together

pub mod clock;
pub mod commands;
pub mod error;
pub mod events;
pub mod monitor;
pub mod scheduler;
pub mod service;
pub mod sinks;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use commands::{Command, CommandResponse};
pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::{StartReason, TimerEvent};
pub use monitor::{MonitorOutcome, SiteMonitor};
pub use scheduler::{RecordingScheduler, Scheduler, TokioScheduler, Wake};
pub use service::{Service, ServiceHandle};
pub use sinks::{HttpHardwareSink, RecordingSink, Sinks, TaskSignal};
pub use storage::{AppConfig, JsonFileStore, KvStore, MemoryStore, Settings};
pub use timer::{
    recover, Phase, RecoveryOutcome, TickOutcome, TimerMachine, TimerOptions, TimerRecord,
    TimerStatus,
};
