//! HTTP bridge to the desk hardware.
//!
//! The bridge listens on a local port and accepts
//! `GET <endpoint>?state=on_task|off_task|break_time`. Delivery is best
//! effort: one attempt, errors logged, nothing retried.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::{HardwareSignal, TaskSignal};
use crate::storage::HardwareConfig;

#[derive(Debug, Clone)]
pub struct HttpHardwareSink {
    client: Client,
    endpoint: String,
}

impl HttpHardwareSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "hardware client builder failed, using defaults");
                Client::new()
            });
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &HardwareConfig) -> Self {
        Self::new(
            config.endpoint.clone(),
            Duration::from_millis(config.timeout_ms),
        )
    }

    /// Sends one signal and reports the outcome.
    pub async fn send(&self, signal: TaskSignal) -> Result<(), reqwest::Error> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("state", signal.as_str())])
            .send()
            .await?;
        resp.error_for_status()?;
        debug!(state = signal.as_str(), "hardware signal delivered");
        Ok(())
    }
}

impl HardwareSignal for HttpHardwareSink {
    fn signal(&self, signal: TaskSignal) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(state = signal.as_str(), "no runtime for hardware signal, dropped");
            return;
        };
        let sink = self.clone();
        handle.spawn(async move {
            if let Err(e) = sink.send(signal).await {
                warn!(state = signal.as_str(), error = %e, "hardware signal failed");
            }
        });
    }
}
