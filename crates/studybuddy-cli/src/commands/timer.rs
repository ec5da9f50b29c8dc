use clap::Subcommand;
use serde_json::json;
use studybuddy_core::commands::dispatch;
use studybuddy_core::Command;

use super::{finish, print_json, CliResult, Session};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a study phase if no timer is running
    Start,
    /// Throw away the current phase and start studying again
    Reset,
    /// Print current timer state as JSON
    Status,
    /// Re-check the deadline now, as a scheduler wake would
    Tick,
}

pub async fn run(action: TimerAction) -> CliResult {
    let session = Session::open().await?;
    let machine = &session.machine;

    match action {
        TimerAction::Start => finish(dispatch(machine, Command::StartTimer).await)?,
        TimerAction::Reset => finish(dispatch(machine, Command::ResetTimer).await)?,
        TimerAction::Status => finish(dispatch(machine, Command::GetTimerStatus).await)?,
        TimerAction::Tick => {
            let outcome = machine.on_tick().await?;
            print_json(&json!({
                "recovery": session.recovered,
                "tick": outcome,
                "status": machine.status().await?,
            }))?;
        }
    }
    Ok(())
}
