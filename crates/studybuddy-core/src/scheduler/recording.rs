use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::Serialize;

use super::Scheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Registration {
    Repeating { interval_secs: u64 },
    Once { at_ms: i64 },
}

/// Remembers registrations and never fires.
///
/// Short-lived processes use it: whatever they arm dies with them and is
/// rebuilt by recovery on the next start.
#[derive(Debug, Default)]
pub struct RecordingScheduler {
    active: Mutex<BTreeMap<String, Registration>>,
    cancels: Mutex<Vec<String>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registration(&self, name: &str) -> Option<Registration> {
        self.active.lock().ok().and_then(|m| m.get(name).copied())
    }

    pub fn active(&self) -> BTreeMap<String, Registration> {
        self.active.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Names passed to `cancel`, in order.
    pub fn cancels(&self) -> Vec<String> {
        self.cancels.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn insert(&self, name: &str, registration: Registration) {
        if let Ok(mut m) = self.active.lock() {
            m.insert(name.to_string(), registration);
        }
    }
}

impl Scheduler for RecordingScheduler {
    fn schedule_repeating(&self, name: &str, interval_secs: u64) {
        self.insert(name, Registration::Repeating { interval_secs });
    }

    fn schedule_once(&self, name: &str, at_ms: i64) {
        self.insert(name, Registration::Once { at_ms });
    }

    fn cancel(&self, name: &str) {
        if let Ok(mut m) = self.active.lock() {
            m.remove(name);
        }
        if let Ok(mut v) = self.cancels.lock() {
            v.push(name.to_string());
        }
    }
}
