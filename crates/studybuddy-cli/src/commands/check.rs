use clap::Args;
use serde_json::json;
use studybuddy_core::SiteMonitor;

use super::{print_json, CliResult, Session};

#[derive(Args)]
pub struct CheckArgs {
    /// Tab URL
    url: String,
    /// Tab id used for debouncing
    #[arg(long, default_value = "0")]
    tab: i64,
}

pub async fn run(args: CheckArgs) -> CliResult {
    let session = Session::open().await?;
    let monitor = SiteMonitor::new(session.config.monitor.debounce_secs);
    let now = session.machine.clock().now_ms();
    let outcome = monitor
        .evaluate(&session.machine, &args.url, args.tab, now)
        .await;
    print_json(&json!({
        "url": args.url,
        "tabId": args.tab,
        "outcome": outcome,
    }))
}
