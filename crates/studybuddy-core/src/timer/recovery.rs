//! Process-start reconciliation.
//!
//! Runs once before anything else is dispatched. Whatever happened while
//! the process was gone, the stored record is brought up to date with at
//! most one transition.

use serde::Serialize;
use tracing::{info, warn};

use super::machine::TimerMachine;
use super::phase::{Phase, TimerRecord};
use crate::clock;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecoveryOutcome {
    /// Nothing was stored; a fresh study phase was started.
    ColdStart { deadline: i64 },
    /// The stored phase is still running.
    Resumed { phase: Phase, remaining_min: u64 },
    /// The stored deadline had passed; one transition was applied.
    CaughtUp { from: Phase, to: Phase, overdue_ms: i64 },
}

pub async fn recover(machine: &TimerMachine) -> Result<RecoveryOutcome> {
    let now = machine.clock().now_ms();
    let record = match TimerRecord::load(machine.store().as_ref()).await {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "timer record unreadable at startup, waiting for next tick");
            machine.arm_tick();
            return Err(e.into());
        }
    };

    match record {
        None => {
            info!("no timer record, cold start");
            let record = machine.cold_start().await?;
            Ok(RecoveryOutcome::ColdStart {
                deadline: record.deadline,
            })
        }
        Some(record) if !clock::is_expired(record.deadline, now) => {
            let remaining_min = machine.resume(&record);
            info!(phase = %record.phase, remaining_min, "resumed running phase");
            Ok(RecoveryOutcome::Resumed {
                phase: record.phase,
                remaining_min,
            })
        }
        Some(record) => {
            let overdue_ms = now.saturating_sub(record.deadline);
            info!(phase = %record.phase, overdue_ms, "deadline passed while stopped, catching up");
            machine.complete_phase(record, now).await?;
            Ok(RecoveryOutcome::CaughtUp {
                from: record.phase,
                to: record.phase.next(),
                overdue_ms,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::clock::{Clock, ManualClock, MS_PER_MINUTE};
    use crate::scheduler::{self, RecordingScheduler, Registration};
    use crate::sinks::{RecordingSink, Sinks};
    use crate::storage::flaky::FlakyStore;
    use crate::storage::{KvStore, MemoryStore, Settings};
    use crate::timer::TimerOptions;

    const T0: i64 = 1_700_000_000_000;

    fn machine(
        store: Arc<dyn KvStore>,
        clock: &ManualClock,
    ) -> (TimerMachine, Arc<RecordingScheduler>, Arc<RecordingSink>) {
        let scheduler = Arc::new(RecordingScheduler::new());
        let sink = Arc::new(RecordingSink::new());
        let machine = TimerMachine::new(
            store,
            scheduler.clone(),
            Arc::new(clock.clone()),
            Sinks::recording(sink.clone()),
            TimerOptions::default(),
        );
        (machine, scheduler, sink)
    }

    #[tokio::test]
    async fn empty_store_cold_starts() {
        let clock = ManualClock::new(T0);
        let (m, sched, _) = machine(Arc::new(MemoryStore::new()), &clock);

        let outcome = recover(&m).await.unwrap();
        assert_eq!(
            outcome,
            RecoveryOutcome::ColdStart {
                deadline: T0 + 25 * MS_PER_MINUTE
            }
        );
        assert!(sched.registration(scheduler::PHASE_END).is_some());
    }

    #[tokio::test]
    async fn running_phase_is_resumed_without_writes() {
        let store = Arc::new(MemoryStore::new());
        let deadline = T0 + 3 * MS_PER_MINUTE;
        TimerRecord::new(Phase::Study, deadline)
            .save(store.as_ref())
            .await
            .unwrap();
        let mut changes = store.subscribe();

        let clock = ManualClock::new(T0);
        let (m, sched, sink) = machine(store.clone(), &clock);
        let outcome = recover(&m).await.unwrap();

        assert_eq!(
            outcome,
            RecoveryOutcome::Resumed {
                phase: Phase::Study,
                remaining_min: 3
            }
        );
        assert!(changes.try_recv().is_err());
        assert_eq!(
            sched.registration(scheduler::PHASE_END),
            Some(Registration::Once { at_ms: deadline })
        );
        assert!(sink.notifications().is_empty());
    }

    #[tokio::test]
    async fn long_absence_applies_one_transition() {
        let store = Arc::new(MemoryStore::with_contents(Settings::new(25, 5).to_map()));
        TimerRecord::new(Phase::Study, T0)
            .save(store.as_ref())
            .await
            .unwrap();

        // many full cycles later
        let clock = ManualClock::new(T0 + 10 * 30 * MS_PER_MINUTE);
        let (m, _, sink) = machine(store.clone(), &clock);
        let outcome = recover(&m).await.unwrap();

        assert_eq!(
            outcome,
            RecoveryOutcome::CaughtUp {
                from: Phase::Study,
                to: Phase::Break,
                overdue_ms: 300 * MS_PER_MINUTE,
            }
        );
        let record = TimerRecord::load(store.as_ref()).await.unwrap().unwrap();
        assert_eq!(record.phase, Phase::Break);
        assert_eq!(record.deadline, clock.now_ms() + 5 * MS_PER_MINUTE);
        assert_eq!(sink.notifications().len(), 1);
    }

    #[tokio::test]
    async fn unreadable_record_arms_tick_and_fails() {
        let store = Arc::new(FlakyStore::new(MemoryStore::new()));
        TimerRecord::new(Phase::Study, T0 - MS_PER_MINUTE)
            .save(store.as_ref())
            .await
            .unwrap();
        store.fail_reads(true);

        let clock = ManualClock::new(T0);
        let (m, sched, sink) = machine(store.clone(), &clock);
        assert!(recover(&m).await.is_err());
        assert_eq!(
            sched.active().into_iter().collect::<Vec<_>>(),
            vec![(
                scheduler::TICK.to_string(),
                Registration::Repeating { interval_secs: 30 }
            )]
        );
        assert!(sink.notifications().is_empty());

        // the armed tick finishes the overdue phase once reads work again
        store.fail_reads(false);
        let outcome = m.on_tick().await.unwrap();
        assert!(matches!(
            outcome,
            crate::timer::TickOutcome::Transitioned {
                from: Phase::Study,
                to: Phase::Break,
                ..
            }
        ));
        assert_eq!(sink.notifications().len(), 1);
    }
}
