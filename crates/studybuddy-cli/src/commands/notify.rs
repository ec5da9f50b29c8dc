use clap::Subcommand;
use studybuddy_core::commands::dispatch;
use studybuddy_core::Command;

use super::{finish, CliResult, Session};

#[derive(Subcommand)]
pub enum NotifyAction {
    /// Send a test notification
    Test,
}

pub async fn run(action: NotifyAction) -> CliResult {
    match action {
        NotifyAction::Test => {
            let session = Session::open().await?;
            finish(dispatch(&session.machine, Command::TestNotification).await)
        }
    }
}
