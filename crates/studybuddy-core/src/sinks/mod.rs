//! Outbound collaborators: notifications, the badge, and the hardware bridge.
//!
//! Every sink is fire-and-forget. Failures are logged inside the sink and
//! never reach the timer.

mod hardware;
mod recording;

pub use hardware::HttpHardwareSink;
pub use recording::{Badge, Notification, RecordingSink};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Two-state on/off task signal, plus the break marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSignal {
    OnTask,
    OffTask,
    BreakTime,
}

impl TaskSignal {
    /// Query-string value understood by the bridge.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskSignal::OnTask => "on_task",
            TaskSignal::OffTask => "off_task",
            TaskSignal::BreakTime => "break_time",
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

pub trait Display: Send + Sync {
    fn set_badge(&self, text: &str, color: &str);
}

pub trait HardwareSignal: Send + Sync {
    fn signal(&self, signal: TaskSignal);
}

/// Logs notifications and badge updates through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl Notifier for TracingSink {
    fn notify(&self, title: &str, message: &str) {
        info!(title, message, "notification");
    }
}

impl Display for TracingSink {
    fn set_badge(&self, text: &str, color: &str) {
        tracing::debug!(text, color, "badge");
    }
}

/// Used when no bridge is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHardware;

impl HardwareSignal for NoHardware {
    fn signal(&self, signal: TaskSignal) {
        tracing::trace!(signal = signal.as_str(), "hardware disabled, signal dropped");
    }
}

/// The three sinks bundled together.
#[derive(Clone)]
pub struct Sinks {
    pub notifier: Arc<dyn Notifier>,
    pub display: Arc<dyn Display>,
    pub hardware: Arc<dyn HardwareSignal>,
}

impl Sinks {
    /// Logs everything, no hardware.
    pub fn tracing() -> Self {
        Self {
            notifier: Arc::new(TracingSink),
            display: Arc::new(TracingSink),
            hardware: Arc::new(NoHardware),
        }
    }

    /// Routes all three to one recording sink.
    pub fn recording(sink: Arc<RecordingSink>) -> Self {
        Self {
            notifier: sink.clone(),
            display: sink.clone(),
            hardware: sink,
        }
    }

    pub fn with_hardware(mut self, hardware: Arc<dyn HardwareSignal>) -> Self {
        self.hardware = hardware;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_wire_values() {
        assert_eq!(TaskSignal::OnTask.as_str(), "on_task");
        assert_eq!(TaskSignal::OffTask.as_str(), "off_task");
        assert_eq!(TaskSignal::BreakTime.as_str(), "break_time");
        assert_eq!(
            serde_json::to_string(&TaskSignal::BreakTime).unwrap(),
            "\"break_time\""
        );
    }
}
