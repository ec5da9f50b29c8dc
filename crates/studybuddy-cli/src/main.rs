use clap::{Parser, Subcommand};
use studybuddy_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "studybuddy-cli", version, about = "StudyBuddy CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Timer control
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
    /// Study and break durations
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Allowed websites
    Allow {
        #[command(subcommand)]
        action: commands::allow::AllowAction,
    },
    /// Check a URL against the allow-list as if a tab had loaded it
    Check(commands::check::CheckArgs),
    /// Notifications
    Notify {
        #[command(subcommand)]
        action: commands::notify::NotifyAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Long-running worker fed with JSON lines on stdin
    Run,
}

fn init_tracing() {
    let default_filter = AppConfig::load_or_default().log.filter;
    let filter = EnvFilter::try_from_env("STUDYBUDDY_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Timer { action } => commands::timer::run(action).await,
        Commands::Settings { action } => commands::settings::run(action).await,
        Commands::Allow { action } => commands::allow::run(action).await,
        Commands::Check(args) => commands::check::run(args).await,
        Commands::Notify { action } => commands::notify::run(action).await,
        Commands::Config { action } => commands::config::run(action),
        Commands::Run => commands::run::run().await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
