//! Unauthorized-site monitor.
//!
//! Watches tab navigations during study phases and warns when a tab leaves
//! the allow-list. Warnings are debounced per tab. Nothing here can fail:
//! unparsable URLs simply do not match.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::events::{at, TimerEvent};
use crate::sinks::TaskSignal;
use crate::storage::settings::load_allowed_websites;
use crate::timer::TimerMachine;

pub const WARNING_TITLE: &str = "Study Focus Warning";
pub const WARNING_MESSAGE: &str =
    "HEY! This website is NOT in your allowed list. Stay focused on the task at hand!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorOutcome {
    /// A break is running.
    Disabled,
    /// Not an http(s) page, or the allow-list could not be read.
    Ignored,
    Allowed,
    /// Off-list, but this tab was warned too recently.
    Suppressed,
    Warned,
}

/// Loose hostname containment.
///
/// The tab's hostname must contain the allow entry's hostname as a
/// substring, so `example.com` also admits `sub.example.com` (and
/// `notexample.com`). Entries without a scheme are read as `https://`.
pub fn host_matches(tab_url: &str, allowed: &str) -> bool {
    let Some(tab_host) = Url::parse(tab_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
    else {
        return false;
    };
    let allowed = allowed.trim();
    let parsed = if allowed.contains("://") {
        Url::parse(allowed)
    } else {
        Url::parse(&format!("https://{allowed}"))
    };
    match parsed.ok().as_ref().and_then(Url::host_str) {
        Some(host) if !host.is_empty() => tab_host.contains(host),
        _ => false,
    }
}

pub fn is_allowed(tab_url: &str, allow_list: &[String]) -> bool {
    allow_list.iter().any(|entry| host_matches(tab_url, entry))
}

fn is_web_page(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| matches!(u.scheme(), "http" | "https"))
}

pub struct SiteMonitor {
    debounce_ms: i64,
    last_warning: Mutex<HashMap<i64, i64>>,
}

impl SiteMonitor {
    pub fn new(debounce_secs: u64) -> Self {
        Self {
            debounce_ms: i64::try_from(debounce_secs.saturating_mul(1000)).unwrap_or(i64::MAX),
            last_warning: Mutex::new(HashMap::new()),
        }
    }

    /// Checks one completed tab load.
    pub async fn evaluate(
        &self,
        machine: &TimerMachine,
        tab_url: &str,
        tab_id: i64,
        now: i64,
    ) -> MonitorOutcome {
        if !machine.monitoring_enabled().await {
            return MonitorOutcome::Disabled;
        }
        if !is_web_page(tab_url) {
            return MonitorOutcome::Ignored;
        }

        let allow_list = match load_allowed_websites(machine.store().as_ref()).await {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "allow-list unreadable, skipping check");
                return MonitorOutcome::Ignored;
            }
        };

        if is_allowed(tab_url, &allow_list) {
            machine.sinks().hardware.signal(TaskSignal::OnTask);
            return MonitorOutcome::Allowed;
        }

        if !self.claim_warning(tab_id, now) {
            debug!(tab_id, "warning suppressed");
            return MonitorOutcome::Suppressed;
        }

        info!(tab_id, url = tab_url, "off-list site");
        machine.sinks().notifier.notify(WARNING_TITLE, WARNING_MESSAGE);
        machine.sinks().hardware.signal(TaskSignal::OffTask);
        machine.emit(TimerEvent::SiteWarning {
            tab_id,
            url: tab_url.to_string(),
            at: at(now),
        });
        MonitorOutcome::Warned
    }

    /// Records a warning for `tab_id` unless one went out within the window.
    ///
    /// Entries whose window has closed are dropped on every claim, so the
    /// map only holds tabs warned within the last `debounce_ms`.
    fn claim_warning(&self, tab_id: i64, now: i64) -> bool {
        let mut last = self.last_warning.lock().unwrap_or_else(|poisoned| {
            warn!("debounce map poisoned, recovering");
            poisoned.into_inner()
        });
        let window = self.debounce_ms;
        last.retain(|_, prev| now.saturating_sub(*prev) < window);
        if last.contains_key(&tab_id) {
            return false;
        }
        last.insert(tab_id, now);
        true
    }

    #[cfg(test)]
    fn tracked_tabs(&self) -> usize {
        self.last_warning
            .lock()
            .map(|m| m.len())
            .unwrap_or_else(|p| p.into_inner().len())
    }
}
