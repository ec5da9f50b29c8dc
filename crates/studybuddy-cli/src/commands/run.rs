//! Long-lived worker.
//!
//! Reads one JSON message per line from stdin and answers on stdout:
//!
//! ```text
//! {"action": "getTimerStatus"}                       -> command response
//! {"tabUpdated": {"tabId": 3, "url": "https://..."}} -> monitor outcome
//! ```
//!
//! Timer events are written to stdout as they happen. EOF or Ctrl+C stops
//! the worker.

use std::io::BufRead;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use studybuddy_core::service;
use studybuddy_core::{
    AppConfig, HttpHardwareSink, JsonFileStore, KvStore, ServiceHandle, SiteMonitor, Sinks,
    SystemClock, TimerMachine, TimerOptions, TokioScheduler,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::CliResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TabUpdate {
    tab_id: i64,
    url: String,
}

pub async fn run() -> CliResult {
    let config = AppConfig::load_or_default();
    let clock = Arc::new(SystemClock);
    let store: Arc<dyn KvStore> = Arc::new(JsonFileStore::open_default()?);
    let (scheduler, wakes) = TokioScheduler::new(clock.clone());

    let mut sinks = Sinks::tracing();
    if config.hardware.enabled {
        info!(endpoint = %config.hardware.endpoint, "hardware bridge enabled");
        sinks = sinks.with_hardware(Arc::new(HttpHardwareSink::from_config(&config.hardware)));
    }

    let machine = TimerMachine::new(
        store,
        Arc::new(scheduler),
        clock,
        sinks,
        TimerOptions::from_config(&config),
    );
    let monitor = SiteMonitor::new(config.monitor.debounce_secs);
    let (handle, task) = service::spawn(machine, monitor, wakes);

    let mut events = handle.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let Ok(line) = serde_json::to_string(&json!({ "event": event })) {
                println!("{line}");
            }
        }
    });

    let mut stop = handle.shutdown_signal();
    tokio::spawn(service::shutdown_on_ctrl_c(handle.clone()));

    let mut lines = stdin_lines();
    loop {
        let line = tokio::select! {
            biased;
            _ = stop.recv() => {
                info!("shutdown requested, leaving input loop");
                break;
            }
            line = lines.recv() => match line {
                Some(line) => line?,
                None => break,
            },
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let reply = answer(&handle, line).await;
        println!("{}", serde_json::to_string(&reply)?);
    }

    handle.shutdown();
    task.await?;
    Ok(())
}

/// Reads stdin on a plain thread.
///
/// A blocked read on tokio's stdin would hold up runtime shutdown; this
/// thread is simply abandoned when the process exits.
fn stdin_lines() -> mpsc::UnboundedReceiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
        debug!("stdin closed");
    });
    rx
}

async fn answer(handle: &ServiceHandle, line: &str) -> Value {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "unparsable input line");
            return json!({ "success": false, "error": e.to_string() });
        }
    };

    if let Some(update) = value.get("tabUpdated") {
        return match TabUpdate::deserialize(update) {
            Ok(update) => match handle.tab_updated(update.tab_id, update.url).await {
                Some(outcome) => json!({ "tabId": update.tab_id, "outcome": outcome }),
                None => json!({ "success": false, "error": "service stopped" }),
            },
            Err(e) => json!({ "success": false, "error": e.to_string() }),
        };
    }

    json!(handle.command_json(line).await)
}
