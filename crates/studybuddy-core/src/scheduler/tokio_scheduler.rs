use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use super::{Scheduler, Wake};
use crate::clock::Clock;

/// Scheduler backed by tokio tasks, one per registration name.
///
/// Fires arrive on the receiver returned by [`TokioScheduler::new`].
pub struct TokioScheduler {
    clock: Arc<dyn Clock>,
    wake_tx: mpsc::UnboundedSender<Wake>,
    tasks: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TokioScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> (Self, mpsc::UnboundedReceiver<Wake>) {
        let (wake_tx, wake_rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            clock,
            wake_tx,
            tasks: Mutex::new(HashMap::new()),
        };
        (scheduler, wake_rx)
    }

    fn replace(&self, name: &str, task: JoinHandle<()>) {
        match self.tasks.lock() {
            Ok(mut tasks) => {
                if let Some(previous) = tasks.insert(name.to_string(), task) {
                    previous.abort();
                }
            }
            Err(_) => {
                warn!(name, "scheduler registry poisoned, wake not armed");
                task.abort();
            }
        }
    }

    pub fn is_armed(&self, name: &str) -> bool {
        self.tasks
            .lock()
            .map(|t| t.get(name).is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&self, name: &str, interval_secs: u64) {
        let tx = self.wake_tx.clone();
        let clock = self.clock.clone();
        let owned = name.to_string();
        let period = Duration::from_secs(interval_secs.max(1));
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                trace!(name = %owned, "repeating wake");
                let wake = Wake {
                    name: owned.clone(),
                    fired_at: clock.now_ms(),
                };
                if tx.send(wake).is_err() {
                    break;
                }
            }
        });
        self.replace(name, task);
    }

    fn schedule_once(&self, name: &str, at_ms: i64) {
        let tx = self.wake_tx.clone();
        let clock = self.clock.clone();
        let owned = name.to_string();
        let delay = Duration::from_millis(at_ms.saturating_sub(clock.now_ms()).max(0) as u64);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!(name = %owned, "one-shot wake");
            tx.send(Wake {
                name: owned,
                fired_at: clock.now_ms(),
            })
            .ok();
        });
        self.replace(name, task);
    }

    fn cancel(&self, name: &str) {
        if let Ok(mut tasks) = self.tasks.lock() {
            if let Some(task) = tasks.remove(name) {
                task.abort();
            }
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        if let Ok(tasks) = self.tasks.get_mut() {
            for (_, task) in tasks.drain() {
                task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;

    #[tokio::test(start_paused = true)]
    async fn once_fires_at_deadline() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let (scheduler, mut rx) = TokioScheduler::new(clock.clone());
        scheduler.schedule_once("end", clock.now_ms() + 5_000);

        let wake = rx.recv().await.unwrap();
        assert_eq!(wake.name, "end");
    }

    #[tokio::test(start_paused = true)]
    async fn repeating_fires_more_than_once() {
        let (scheduler, mut rx) = TokioScheduler::new(Arc::new(SystemClock));
        scheduler.schedule_repeating("tick", 1);

        assert_eq!(rx.recv().await.unwrap().name, "tick");
        assert_eq!(rx.recv().await.unwrap().name, "tick");
        assert!(scheduler.is_armed("tick"));
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_previous_wake() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let (scheduler, mut rx) = TokioScheduler::new(clock.clone());
        scheduler.schedule_once("end", clock.now_ms() + 60_000);
        scheduler.schedule_once("end", clock.now_ms() + 1_000);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(rx.recv().await.unwrap().name, "end");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_delivery() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let (scheduler, mut rx) = TokioScheduler::new(clock.clone());
        scheduler.schedule_once("end", clock.now_ms() + 1_000);
        scheduler.cancel("end");

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
        assert!(!scheduler.is_armed("end"));
    }
}
