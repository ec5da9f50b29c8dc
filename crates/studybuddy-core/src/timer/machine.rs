//! Study/break state machine.
//!
//! The machine is the only writer of the persisted [`TimerRecord`]. It keeps
//! no timer state of its own: every operation loads the record, decides,
//! and writes the full record back in one store update.
//!
//! ## Transitions
//!
//! ```text
//! STUDY --deadline--> BREAK --deadline--> STUDY
//!   any --settings changed--> same phase, fresh deadline
//!   any --reset--> STUDY
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::phase::{Phase, TimerRecord};
use crate::clock::{self, Clock};
use crate::error::Result;
use crate::events::{at, StartReason, TimerEvent};
use crate::scheduler::{self, Scheduler, Wake};
use crate::sinks::{Sinks, TaskSignal};
use crate::storage::{AppConfig, KvStore, Settings};

/// Knobs the machine takes from the app config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerOptions {
    pub tick_interval_secs: u64,
    pub study_color: String,
    pub break_color: String,
}

impl Default for TimerOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl TimerOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            tick_interval_secs: config.timer.tick_interval_secs,
            study_color: config.badge.study_color.clone(),
            break_color: config.badge.break_color.clone(),
        }
    }

    pub fn color_for(&self, phase: Phase) -> &str {
        match phase {
            Phase::Study => &self.study_color,
            Phase::Break => &self.break_color,
        }
    }
}

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// Phase still running; display refreshed.
    Refreshed { phase: Phase, remaining_min: u64 },
    /// Deadline had passed; moved to the next phase.
    Transitioned { from: Phase, to: Phase, deadline: i64 },
    /// No record was stored; a study phase was started.
    ColdStarted { deadline: i64 },
}

/// Read-only view for the popup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerStatus {
    pub phase: Option<Phase>,
    pub deadline: Option<i64>,
    pub remaining_minutes: u64,
    pub study_duration: u32,
    pub break_duration: u32,
    pub monitoring: bool,
}

pub struct TimerMachine {
    store: Arc<dyn KvStore>,
    scheduler: Arc<dyn Scheduler>,
    clock: Arc<dyn Clock>,
    sinks: Sinks,
    options: TimerOptions,
    events: broadcast::Sender<TimerEvent>,
}

impl TimerMachine {
    pub fn new(
        store: Arc<dyn KvStore>,
        scheduler: Arc<dyn Scheduler>,
        clock: Arc<dyn Clock>,
        sinks: Sinks,
        options: TimerOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            store,
            scheduler,
            clock,
            sinks,
            options,
            events,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<TimerEvent> {
        self.events.subscribe()
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn sinks(&self) -> &Sinks {
        &self.sinks
    }

    pub fn options(&self) -> &TimerOptions {
        &self.options
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<TimerEvent> {
        self.events.clone()
    }

    pub(crate) fn emit(&self, event: TimerEvent) {
        self.events.send(event).ok();
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub async fn record(&self) -> Result<Option<TimerRecord>> {
        Ok(TimerRecord::load(self.store.as_ref()).await?)
    }

    /// Site monitoring runs unless a break is in progress.
    pub async fn monitoring_enabled(&self) -> bool {
        match self.record().await {
            Ok(Some(record)) => record.phase != Phase::Break,
            Ok(None) => true,
            Err(e) => {
                warn!(error = %e, "phase unreadable, monitoring stays on");
                true
            }
        }
    }

    pub async fn status(&self) -> Result<TimerStatus> {
        let record = self.record().await?;
        let settings = Settings::load(self.store.as_ref()).await;
        let now = self.clock.now_ms();
        Ok(TimerStatus {
            phase: record.map(|r| r.phase),
            deadline: record.map(|r| r.deadline),
            remaining_minutes: record
                .map(|r| clock::remaining_minutes(r.deadline, now))
                .unwrap_or(0),
            study_duration: settings.study_minutes,
            break_duration: settings.break_minutes,
            monitoring: record.map_or(true, |r| r.phase != Phase::Break),
        })
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Starts `phase` lasting `minutes` from now.
    ///
    /// The record is persisted before any wake is armed. If the write
    /// fails only the repeating tick is armed, so the next tick retries.
    pub async fn start_phase(
        &self,
        phase: Phase,
        minutes: u32,
        reason: StartReason,
    ) -> Result<TimerRecord> {
        let now = self.clock.now_ms();
        let record = TimerRecord::new(phase, clock::deadline_after(now, minutes));

        if let Err(e) = record.save(self.store.as_ref()).await {
            warn!(%phase, error = %e, "failed to persist phase start, will retry on next tick");
            self.arm_tick();
            return Err(e.into());
        }

        self.arm(&record);
        self.refresh_display(&record, now);
        info!(%phase, minutes, deadline = record.deadline, ?reason, "phase started");

        match (reason, phase) {
            (StartReason::ConfigurationChanged, _) => {}
            (_, Phase::Study) => self.sinks.hardware.signal(TaskSignal::OnTask),
            (_, Phase::Break) => self.sinks.hardware.signal(TaskSignal::BreakTime),
        }

        self.emit(TimerEvent::PhaseStarted {
            phase,
            deadline: record.deadline,
            duration_ms: record.deadline - now,
            reason,
            at: at(now),
        });
        Ok(record)
    }

    /// Re-evaluates the stored deadline against the current time.
    ///
    /// Duplicate or late ticks are harmless: each call re-reads the record,
    /// and a transition writes a deadline in the future, so a second call
    /// at the same instant only refreshes the display.
    pub async fn on_tick(&self) -> Result<TickOutcome> {
        let now = self.clock.now_ms();
        let record = match self.record().await {
            Ok(record) => record,
            Err(e) => {
                // keep the fallback path alive
                self.arm_tick();
                return Err(e);
            }
        };

        match record {
            None => self.cold_start().await.map(|record| TickOutcome::ColdStarted {
                deadline: record.deadline,
            }),
            Some(record) if clock::is_expired(record.deadline, now) => {
                self.complete_phase(record, now).await
            }
            Some(record) => {
                let remaining_min = self.refresh_display(&record, now);
                self.emit(TimerEvent::Tick {
                    phase: record.phase,
                    remaining_min,
                    at: at(now),
                });
                Ok(TickOutcome::Refreshed {
                    phase: record.phase,
                    remaining_min,
                })
            }
        }
    }

    /// Routes a scheduler fire. Both wakes end in the same deadline check.
    pub async fn on_wake(&self, wake: &Wake) -> Result<Option<TickOutcome>> {
        match wake.name.as_str() {
            scheduler::TICK | scheduler::PHASE_END => {
                debug!(name = %wake.name, fired_at = wake.fired_at, "wake");
                self.on_tick().await.map(Some)
            }
            other => {
                debug!(name = other, "ignoring unknown wake");
                Ok(None)
            }
        }
    }

    /// Restarts whichever phase is active with the new durations.
    pub async fn on_configuration_changed(&self, settings: Settings) -> Result<TimerRecord> {
        let phase = self
            .record()
            .await?
            .map(|r| r.phase)
            .unwrap_or(Phase::Study);
        info!(%phase, study = settings.study_minutes, brk = settings.break_minutes, "settings changed");
        self.start_phase(
            phase,
            settings.duration_for(phase),
            StartReason::ConfigurationChanged,
        )
        .await
    }

    /// Forgets stored durations and restarts the current phase on defaults.
    pub async fn reset_settings(&self) -> Result<TimerRecord> {
        Settings::clear(self.store.as_ref()).await?;
        self.on_configuration_changed(Settings::default()).await
    }

    /// Fresh study period, no transition notification.
    pub async fn reset(&self) -> Result<TimerRecord> {
        let settings = Settings::load(self.store.as_ref()).await;
        self.start_phase(Phase::Study, settings.study_minutes, StartReason::Reset)
            .await
    }

    // ── Internal ─────────────────────────────────────────────────────

    pub(crate) async fn cold_start(&self) -> Result<TimerRecord> {
        let settings = Settings::load(self.store.as_ref()).await;
        self.start_phase(Phase::Study, settings.study_minutes, StartReason::ColdStart)
            .await
    }

    /// Applies the "deadline reached" row for `expired.phase`.
    pub(crate) async fn complete_phase(
        &self,
        expired: TimerRecord,
        now: i64,
    ) -> Result<TickOutcome> {
        let settings = Settings::load(self.store.as_ref()).await;
        let from = expired.phase;
        let to = from.next();
        let minutes = settings.duration_for(to);
        let record = self.start_phase(to, minutes, StartReason::Transition).await?;

        match to {
            Phase::Break => self.sinks.notifier.notify(
                "Break Time!",
                &format!("Great work! Take a {minutes} minute break."),
            ),
            Phase::Study => self.sinks.notifier.notify(
                "Study Time",
                &format!("Break's over. Back to studying for {minutes} minutes."),
            ),
        }

        let overdue_ms = now.saturating_sub(expired.deadline);
        info!(%from, %to, overdue_ms, "phase completed");
        self.emit(TimerEvent::PhaseCompleted {
            from,
            to,
            overdue_ms,
            at: at(now),
        });
        Ok(TickOutcome::Transitioned {
            from,
            to,
            deadline: record.deadline,
        })
    }

    /// Re-arms wakes for a phase already in progress.
    pub(crate) fn resume(&self, record: &TimerRecord) -> u64 {
        let now = self.clock.now_ms();
        self.arm(record);
        let remaining_min = self.refresh_display(record, now);
        self.emit(TimerEvent::Resumed {
            phase: record.phase,
            deadline: record.deadline,
            remaining_min,
            at: at(now),
        });
        remaining_min
    }

    fn arm(&self, record: &TimerRecord) {
        self.scheduler.cancel(scheduler::TICK);
        self.scheduler.cancel(scheduler::PHASE_END);
        self.scheduler
            .schedule_repeating(scheduler::TICK, self.options.tick_interval_secs);
        self.scheduler
            .schedule_once(scheduler::PHASE_END, record.deadline);
    }

    pub(crate) fn arm_tick(&self) {
        self.scheduler.cancel(scheduler::TICK);
        self.scheduler
            .schedule_repeating(scheduler::TICK, self.options.tick_interval_secs);
    }

    fn refresh_display(&self, record: &TimerRecord, now: i64) -> u64 {
        let remaining_min = clock::remaining_minutes(record.deadline, now);
        self.sinks.display.set_badge(
            &remaining_min.to_string(),
            self.options.color_for(record.phase),
        );
        remaining_min
    }
}
