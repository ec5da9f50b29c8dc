//! Request/response commands from the popup and settings page.
//!
//! Requests arrive as JSON objects tagged by `action`. Every request gets a
//! response; failures are reported in it, never raised.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{CoreError, ValidationError};
use crate::storage::Settings;
use crate::timer::{TimerMachine, TimerStatus};

const ACTIONS: &[&str] = &[
    "startTimer",
    "resetTimer",
    "updateSettings",
    "testNotification",
    "getTimerStatus",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Command {
    /// Starts a study phase if no timer exists yet.
    StartTimer,
    ResetTimer,
    /// Saves whichever durations are given, then restarts the current
    /// phase. With neither given, settings are re-read from the store.
    UpdateSettings {
        #[serde(default, rename = "studyDuration", skip_serializing_if = "Option::is_none")]
        study_duration: Option<u32>,
        #[serde(default, rename = "breakDuration", skip_serializing_if = "Option::is_none")]
        break_duration: Option<u32>,
    },
    TestNotification,
    GetTimerStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TimerStatus>,
}

impl CommandResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            status: None,
        }
    }

    pub fn with_status(status: TimerStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::ok()
        }
    }

    pub fn failure(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            status: None,
        }
    }
}

impl From<crate::error::Result<()>> for CommandResponse {
    fn from(result: crate::error::Result<()>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => Self::failure(e),
        }
    }
}

/// Parses a raw request.
///
/// An `action` outside the known set is reported as an unknown command
/// rather than a generic parse error.
pub fn parse(raw: &str) -> Result<Command, CoreError> {
    let value: Value = serde_json::from_str(raw)?;
    parse_value(value)
}

pub fn parse_value(value: Value) -> Result<Command, CoreError> {
    match value.get("action").and_then(Value::as_str) {
        Some(action) if ACTIONS.contains(&action) => Ok(serde_json::from_value(value)?),
        Some(action) => Err(ValidationError::UnknownCommand(action.to_string()).into()),
        None => Err(ValidationError::UnknownCommand(String::from("<missing action>")).into()),
    }
}

pub async fn handle_json(machine: &TimerMachine, raw: &str) -> CommandResponse {
    match parse(raw) {
        Ok(command) => dispatch(machine, command).await,
        Err(e) => {
            warn!(error = %e, "rejected command");
            CommandResponse::failure(e)
        }
    }
}

pub async fn dispatch(machine: &TimerMachine, command: Command) -> CommandResponse {
    debug!(?command, "command");
    match command {
        Command::StartTimer => start_timer(machine).await.into(),
        Command::ResetTimer => machine.reset().await.map(|_| ()).into(),
        Command::UpdateSettings {
            study_duration,
            break_duration,
        } => update_settings(machine, study_duration, break_duration)
            .await
            .into(),
        Command::TestNotification => {
            machine
                .sinks()
                .notifier
                .notify("Test Notification", "StudyBuddy notifications are working.");
            CommandResponse::ok()
        }
        Command::GetTimerStatus => match machine.status().await {
            Ok(status) => CommandResponse::with_status(status),
            Err(e) => CommandResponse::failure(e),
        },
    }
}

async fn start_timer(machine: &TimerMachine) -> crate::error::Result<()> {
    if machine.record().await?.is_none() {
        machine.on_tick().await?;
    }
    Ok(())
}

async fn update_settings(
    machine: &TimerMachine,
    study: Option<u32>,
    brk: Option<u32>,
) -> crate::error::Result<()> {
    let store = machine.store().as_ref();
    let settings = if study.is_none() && brk.is_none() {
        Settings::try_load(store).await?
    } else {
        let current = Settings::load(store).await;
        let updated = Settings::new(
            study.unwrap_or(current.study_minutes),
            brk.unwrap_or(current.break_minutes),
        );
        updated.save(store).await?;
        updated
    };
    machine.on_configuration_changed(settings).await?;
    Ok(())
}
