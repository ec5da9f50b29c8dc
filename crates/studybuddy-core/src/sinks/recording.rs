use std::sync::Mutex;

use serde::Serialize;

use super::{Display, HardwareSignal, Notifier, TaskSignal};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub text: String,
    pub color: String,
}

/// Keeps everything it is handed so tests can read it back.
#[derive(Debug, Default)]
pub struct RecordingSink {
    notifications: Mutex<Vec<Notification>>,
    badges: Mutex<Vec<Badge>>,
    signals: Mutex<Vec<TaskSignal>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn badges(&self) -> Vec<Badge> {
        self.badges.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn last_badge(&self) -> Option<Badge> {
        self.badges.lock().ok().and_then(|v| v.last().cloned())
    }

    pub fn signals(&self) -> Vec<TaskSignal> {
        self.signals.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut v) = self.notifications.lock() {
            v.clear();
        }
        if let Ok(mut v) = self.badges.lock() {
            v.clear();
        }
        if let Ok(mut v) = self.signals.lock() {
            v.clear();
        }
    }
}

impl Notifier for RecordingSink {
    fn notify(&self, title: &str, message: &str) {
        if let Ok(mut v) = self.notifications.lock() {
            v.push(Notification {
                title: title.to_string(),
                message: message.to_string(),
            });
        }
    }
}

impl Display for RecordingSink {
    fn set_badge(&self, text: &str, color: &str) {
        if let Ok(mut v) = self.badges.lock() {
            v.push(Badge {
                text: text.to_string(),
                color: color.to_string(),
            });
        }
    }
}

impl HardwareSignal for RecordingSink {
    fn signal(&self, signal: TaskSignal) {
        if let Ok(mut v) = self.signals.lock() {
            v.push(signal);
        }
    }
}
