pub mod allow;
pub mod check;
pub mod config;
pub mod notify;
pub mod run;
pub mod settings;
pub mod timer;

use std::sync::Arc;

use serde::Serialize;
use studybuddy_core::{
    recover, AppConfig, CommandResponse, JsonFileStore, KvStore, RecordingScheduler,
    RecoveryOutcome, Sinks, SystemClock, TimerMachine, TimerOptions,
};
use tracing::warn;

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// A one-shot process: open the store, recover, do one thing, exit.
///
/// Wakes armed here die with the process; the next invocation rebuilds
/// them through recovery.
pub struct Session {
    pub machine: TimerMachine,
    pub config: AppConfig,
    pub recovered: Option<RecoveryOutcome>,
}

impl Session {
    pub async fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = AppConfig::load_or_default();
        let store: Arc<dyn KvStore> = Arc::new(JsonFileStore::open_default()?);
        let machine = TimerMachine::new(
            store,
            Arc::new(RecordingScheduler::new()),
            Arc::new(SystemClock),
            Sinks::tracing(),
            TimerOptions::from_config(&config),
        );
        let recovered = match recover(&machine).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(error = %e, "recovery failed");
                None
            }
        };
        Ok(Self {
            machine,
            config,
            recovered,
        })
    }
}

/// Opens the store without touching the timer.
pub fn open_store() -> Result<JsonFileStore, Box<dyn std::error::Error>> {
    Ok(JsonFileStore::open_default()?)
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints the response and turns `success: false` into an error exit.
pub fn finish(response: CommandResponse) -> CliResult {
    print_json(&response)?;
    match response.error {
        Some(error) if !response.success => Err(error.into()),
        _ => Ok(()),
    }
}
