use clap::Subcommand;
use studybuddy_core::commands::dispatch;
use studybuddy_core::storage::settings::PRESETS;
use studybuddy_core::{Command, CommandResponse, Settings};

use super::{finish, open_store, print_json, CliResult, Session};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Show stored durations
    Show,
    /// Change durations and restart the current phase
    Set {
        /// Study minutes
        #[arg(long)]
        study: Option<u32>,
        /// Break minutes
        #[arg(long = "break")]
        brk: Option<u32>,
    },
    /// Apply a named preset (classic, short, long, deep)
    Preset {
        name: String,
    },
    /// Forget stored durations and restart the current phase on 25/5
    Reset,
}

pub async fn run(action: SettingsAction) -> CliResult {
    match action {
        SettingsAction::Show => {
            let store = open_store()?;
            let settings = Settings::try_load(&store).await?;
            print_json(&settings)?;
        }
        SettingsAction::Set { study, brk } => {
            let session = Session::open().await?;
            let command = Command::UpdateSettings {
                study_duration: study,
                break_duration: brk,
            };
            finish(dispatch(&session.machine, command).await)?;
        }
        SettingsAction::Preset { name } => {
            let Some(preset) = Settings::preset(&name) else {
                let known: Vec<&str> = PRESETS.iter().map(|(n, _)| *n).collect();
                return Err(format!("unknown preset '{name}' (known: {})", known.join(", ")).into());
            };
            let session = Session::open().await?;
            let command = Command::UpdateSettings {
                study_duration: Some(preset.study_minutes),
                break_duration: Some(preset.break_minutes),
            };
            finish(dispatch(&session.machine, command).await)?;
        }
        SettingsAction::Reset => {
            let session = Session::open().await?;
            let response = match session.machine.reset_settings().await {
                Ok(_) => match session.machine.status().await {
                    Ok(status) => CommandResponse::with_status(status),
                    Err(e) => CommandResponse::failure(e),
                },
                Err(e) => CommandResponse::failure(e),
            };
            finish(response)?;
        }
    }
    Ok(())
}
