use clap::Subcommand;
use studybuddy_core::storage::settings::{
    clear_allowed_websites, load_allowed_websites, save_allowed_websites,
};

use super::{open_store, print_json, CliResult};

#[derive(Subcommand)]
pub enum AllowAction {
    /// List allowed websites
    List,
    /// Add a website (e.g. "https://docs.rs" or "example.com")
    Add {
        url: String,
    },
    /// Remove a website
    Remove {
        url: String,
    },
    /// Remove every entry
    Clear,
}

pub async fn run(action: AllowAction) -> CliResult {
    let store = open_store()?;
    match action {
        AllowAction::List => {
            print_json(&load_allowed_websites(&store).await?)?;
        }
        AllowAction::Add { url } => {
            let mut sites = load_allowed_websites(&store).await?;
            let url = url.trim().to_string();
            if !sites.contains(&url) {
                sites.push(url);
            }
            print_json(&save_allowed_websites(&store, &sites).await?)?;
        }
        AllowAction::Remove { url } => {
            let mut sites = load_allowed_websites(&store).await?;
            sites.retain(|s| s != url.trim());
            print_json(&save_allowed_websites(&store, &sites).await?)?;
        }
        AllowAction::Clear => {
            clear_allowed_websites(&store).await?;
            print_json(&Vec::<String>::new())?;
        }
    }
    Ok(())
}
