//! Single-threaded event dispatcher.
//!
//! Every input (scheduler wakes, commands, tab updates, store changes) is
//! funnelled through one `select!` loop, so no two handlers ever touch the
//! timer record at the same time. Recovery runs before the loop starts.

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::commands::{self, Command, CommandResponse};
use crate::error::Result;
use crate::events::TimerEvent;
use crate::monitor::{MonitorOutcome, SiteMonitor};
use crate::scheduler::Wake;
use crate::storage::{keys, Settings, StorageChange};
use crate::timer::{recover, RecoveryOutcome, TimerMachine};

const REQUEST_CAPACITY: usize = 64;

#[derive(Debug)]
enum Request {
    Command {
        command: Command,
        reply: oneshot::Sender<CommandResponse>,
    },
    Raw {
        json: String,
        reply: oneshot::Sender<CommandResponse>,
    },
    TabUpdated {
        tab_id: i64,
        url: String,
        reply: oneshot::Sender<MonitorOutcome>,
    },
}

/// Cloneable entry point into a running [`Service`].
#[derive(Clone)]
pub struct ServiceHandle {
    requests: mpsc::Sender<Request>,
    shutdown: broadcast::Sender<()>,
    events: broadcast::Sender<TimerEvent>,
}

impl ServiceHandle {
    pub async fn command(&self, command: Command) -> CommandResponse {
        let (reply, rx) = oneshot::channel();
        self.call(Request::Command { command, reply }, rx)
            .await
            .unwrap_or_else(|| CommandResponse::failure("service stopped"))
    }

    /// Forwards an unparsed JSON request.
    pub async fn command_json(&self, json: impl Into<String>) -> CommandResponse {
        let (reply, rx) = oneshot::channel();
        let json = json.into();
        self.call(Request::Raw { json, reply }, rx)
            .await
            .unwrap_or_else(|| CommandResponse::failure("service stopped"))
    }

    /// Reports a completed tab load. `None` if the service is gone.
    pub async fn tab_updated(&self, tab_id: i64, url: impl Into<String>) -> Option<MonitorOutcome> {
        let (reply, rx) = oneshot::channel();
        let url = url.into();
        self.call(Request::TabUpdated { tab_id, url, reply }, rx).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    /// Fires once when [`shutdown`](Self::shutdown) is called from any handle.
    pub fn shutdown_signal(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }

    pub fn shutdown(&self) {
        if self.shutdown.send(()).is_err() {
            debug!("service already stopped");
        }
    }

    async fn call<T>(&self, request: Request, rx: oneshot::Receiver<T>) -> Option<T> {
        self.requests.send(request).await.ok()?;
        rx.await.ok()
    }
}

pub struct Service {
    machine: TimerMachine,
    monitor: SiteMonitor,
    wakes: mpsc::UnboundedReceiver<Wake>,
    requests: mpsc::Receiver<Request>,
    shutdown_tx: broadcast::Sender<()>,
    /// Durations the running phase was last started with.
    applied: Option<Settings>,
}

impl Service {
    pub fn new(
        machine: TimerMachine,
        monitor: SiteMonitor,
        wakes: mpsc::UnboundedReceiver<Wake>,
    ) -> (Self, ServiceHandle) {
        let (requests_tx, requests) = mpsc::channel(REQUEST_CAPACITY);
        let (shutdown_tx, _) = broadcast::channel(1);
        let handle = ServiceHandle {
            requests: requests_tx,
            shutdown: shutdown_tx.clone(),
            events: machine.event_sender(),
        };
        let service = Self {
            machine,
            monitor,
            wakes,
            requests,
            shutdown_tx,
            applied: None,
        };
        (service, handle)
    }

    /// Recovers, then dispatches until shutdown or until every handle is
    /// dropped.
    pub async fn run(mut self) -> Option<RecoveryOutcome> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut changes = self.machine.store().subscribe();
        let mut watching_store = true;

        let recovered = match recover(&self.machine).await {
            Ok(outcome) => {
                info!(?outcome, "recovery complete");
                Some(outcome)
            }
            Err(e) => {
                error!(error = %e, "recovery failed, next tick will retry");
                None
            }
        };
        self.applied = Some(Settings::load(self.machine.store().as_ref()).await);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => break,
                Some(wake) = self.wakes.recv() => {
                    if let Err(e) = self.machine.on_wake(&wake).await {
                        warn!(name = %wake.name, error = %e, "wake handling failed");
                    }
                }
                request = self.requests.recv() => match request {
                    Some(request) => self.handle(request).await,
                    None => break,
                },
                change = changes.recv(), if watching_store => match change {
                    Ok(change) => self.on_storage_change(&change).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "store change stream lagged, rechecking settings");
                        self.apply_settings_if_changed().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!("store change stream closed");
                        watching_store = false;
                    }
                },
            }
        }

        info!("service stopped");
        recovered
    }

    async fn handle(&mut self, request: Request) {
        match request {
            Request::Command { command, reply } => {
                let response = commands::dispatch(&self.machine, command).await;
                self.after_command().await;
                reply.send(response).ok();
            }
            Request::Raw { json, reply } => {
                let response = commands::handle_json(&self.machine, &json).await;
                self.after_command().await;
                reply.send(response).ok();
            }
            Request::TabUpdated { tab_id, url, reply } => {
                let now = self.machine.clock().now_ms();
                let outcome = self.monitor.evaluate(&self.machine, &url, tab_id, now).await;
                reply.send(outcome).ok();
            }
        }
    }

    async fn after_command(&mut self) {
        self.applied = Some(Settings::load(self.machine.store().as_ref()).await);
    }

    async fn on_storage_change(&mut self, change: &StorageChange) {
        if change.touches(keys::STUDY_DURATION) || change.touches(keys::BREAK_DURATION) {
            self.apply_settings_if_changed().await;
        }
    }

    /// Restarts the current phase when another writer changed durations.
    async fn apply_settings_if_changed(&mut self) {
        let settings = match Settings::try_load(self.machine.store().as_ref()).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "ignoring unreadable settings change");
                return;
            }
        };
        if self.applied == Some(settings) {
            debug!("settings unchanged, phase kept");
            return;
        }
        match self.machine.on_configuration_changed(settings).await {
            Ok(_) => self.applied = Some(settings),
            Err(e) => warn!(error = %e, "failed to apply settings change"),
        }
    }
}

/// Builds and spawns a service on the current runtime.
pub fn spawn(
    machine: TimerMachine,
    monitor: SiteMonitor,
    wakes: mpsc::UnboundedReceiver<Wake>,
) -> (ServiceHandle, tokio::task::JoinHandle<Option<RecoveryOutcome>>) {
    let (service, handle) = Service::new(machine, monitor, wakes);
    (handle, tokio::spawn(service.run()))
}

/// Waits for Ctrl+C, then asks the service to stop.
pub async fn shutdown_on_ctrl_c(handle: ServiceHandle) -> Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    handle.shutdown();
    Ok(())
}
