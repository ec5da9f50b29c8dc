//! End-to-end timer scenarios against real stores.
//!
//! Each "process" is a fresh `TimerMachine` over the same store, the way a
//! restarted worker would see it.

use std::sync::Arc;

use studybuddy_core::clock::{Clock, ManualClock, MS_PER_MINUTE};
use studybuddy_core::scheduler::{self, Registration};
use studybuddy_core::{
    recover, JsonFileStore, KvStore, MemoryStore, Phase, RecordingScheduler, RecordingSink,
    RecoveryOutcome, Settings, Sinks, TickOutcome, TimerMachine, TimerOptions, TimerRecord,
};

const T0: i64 = 1_700_000_000_000;

struct Process {
    machine: TimerMachine,
    scheduler: Arc<RecordingScheduler>,
    sink: Arc<RecordingSink>,
}

fn boot(store: Arc<dyn KvStore>, clock: &ManualClock) -> Process {
    let scheduler = Arc::new(RecordingScheduler::new());
    let sink = Arc::new(RecordingSink::new());
    let machine = TimerMachine::new(
        store,
        scheduler.clone(),
        Arc::new(clock.clone()),
        Sinks::recording(sink.clone()),
        TimerOptions::default(),
    );
    Process {
        machine,
        scheduler,
        sink,
    }
}

#[tokio::test]
async fn one_minute_cycle_end_to_end() {
    // written straight to the store; the settings form would reject 1/1
    let store: Arc<dyn KvStore> =
        Arc::new(MemoryStore::with_contents(Settings::new(1, 1).to_map()));
    let clock = ManualClock::new(T0);
    let p = boot(store, &clock);

    recover(&p.machine).await.unwrap();
    let study_color = p.sink.last_badge().unwrap().color;

    clock.advance_secs(61);
    let outcome = p.machine.on_tick().await.unwrap();
    assert_eq!(
        outcome,
        TickOutcome::Transitioned {
            from: Phase::Study,
            to: Phase::Break,
            deadline: T0 + 61_000 + MS_PER_MINUTE,
        }
    );

    let break_color = p.sink.last_badge().unwrap().color;
    assert_ne!(study_color, break_color);

    // late duplicate wake for the same deadline
    p.machine.on_tick().await.unwrap();
    let breaks = p
        .sink
        .notifications()
        .into_iter()
        .filter(|n| n.title == "Break Time!")
        .count();
    assert_eq!(breaks, 1);
}

#[tokio::test]
async fn restart_mid_phase_resumes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    let clock = ManualClock::new(T0);

    {
        let store: Arc<dyn KvStore> = Arc::new(JsonFileStore::new(&path));
        let p = boot(store, &clock);
        assert!(matches!(
            recover(&p.machine).await.unwrap(),
            RecoveryOutcome::ColdStart { .. }
        ));
    }

    clock.advance_ms(10 * MS_PER_MINUTE);
    let store: Arc<dyn KvStore> = Arc::new(JsonFileStore::new(&path));
    let p = boot(store.clone(), &clock);
    assert_eq!(
        recover(&p.machine).await.unwrap(),
        RecoveryOutcome::Resumed {
            phase: Phase::Study,
            remaining_min: 15
        }
    );
    assert_eq!(
        p.scheduler.registration(scheduler::PHASE_END),
        Some(Registration::Once {
            at_ms: T0 + 25 * MS_PER_MINUTE
        })
    );
    assert!(p.sink.notifications().is_empty());
}

#[tokio::test]
async fn restart_after_many_cycles_transitions_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.json");
    let clock = ManualClock::new(T0);

    {
        let store: Arc<dyn KvStore> = Arc::new(JsonFileStore::new(&path));
        Settings::new(25, 5).save(store.as_ref()).await.unwrap();
        let p = boot(store, &clock);
        recover(&p.machine).await.unwrap();
    }

    // asleep for a full day
    clock.advance_ms(24 * 60 * MS_PER_MINUTE);
    let store: Arc<dyn KvStore> = Arc::new(JsonFileStore::new(&path));
    let p = boot(store.clone(), &clock);
    let outcome = recover(&p.machine).await.unwrap();
    assert!(matches!(
        outcome,
        RecoveryOutcome::CaughtUp {
            from: Phase::Study,
            to: Phase::Break,
            ..
        }
    ));

    let record = TimerRecord::load(store.as_ref()).await.unwrap().unwrap();
    assert_eq!(record.phase, Phase::Break);
    assert_eq!(record.deadline, clock.now_ms() + 5 * MS_PER_MINUTE);
    assert_eq!(p.sink.notifications().len(), 1);

    // a second restart right away is a plain resume
    let p = boot(store, &clock);
    assert!(matches!(
        recover(&p.machine).await.unwrap(),
        RecoveryOutcome::Resumed {
            phase: Phase::Break,
            ..
        }
    ));
}

#[tokio::test]
async fn settings_change_mid_break_keeps_break() {
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let clock = ManualClock::new(T0);
    let p = boot(store.clone(), &clock);

    recover(&p.machine).await.unwrap();
    clock.advance_ms(25 * MS_PER_MINUTE);
    p.machine.on_tick().await.unwrap();

    clock.advance_ms(2 * MS_PER_MINUTE);
    let updated = Settings::new(30, 10);
    updated.save(store.as_ref()).await.unwrap();
    let record = p.machine.on_configuration_changed(updated).await.unwrap();

    assert_eq!(record.phase, Phase::Break);
    assert_eq!(record.deadline, clock.now_ms() + 10 * MS_PER_MINUTE);
}
