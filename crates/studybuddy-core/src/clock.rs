//! Wall-clock access and the period clock.
//!
//! Deadlines are absolute epoch milliseconds. Everything the display needs
//! is recomputed from `(deadline, now)` on demand, so a process that slept
//! through part of a phase reads the right value on its first event.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;

pub const MS_PER_MINUTE: i64 = 60_000;

/// Shortest phase that will be written. Keeps a zero-minute break from
/// producing a deadline equal to `now`.
pub const MIN_PHASE_MS: i64 = 1_000;

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Controllable clock for tests and deterministic replay.
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(now_ms)),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance_ms(secs * 1_000);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Milliseconds left until `deadline`, never negative.
pub fn remaining_ms(deadline: i64, now: i64) -> i64 {
    deadline.saturating_sub(now).max(0)
}

/// Whole minutes left until `deadline`, rounded up and clamped to zero.
///
/// Non-increasing in `now`; exactly zero from `now == deadline` onwards.
///
/// Computed in `i128` so every `(deadline, now)` pair is exact; the largest
/// possible result is under `2^64 / 60_000`.
pub fn remaining_minutes(deadline: i64, now: i64) -> u64 {
    let ms = (i128::from(deadline) - i128::from(now)).max(0);
    let minutes = ms / i128::from(MS_PER_MINUTE) + i128::from(ms % i128::from(MS_PER_MINUTE) != 0);
    u64::try_from(minutes).unwrap_or(u64::MAX)
}

pub fn is_expired(deadline: i64, now: i64) -> bool {
    remaining_ms(deadline, now) == 0
}

/// Length of a phase of `minutes`, floored at [`MIN_PHASE_MS`].
pub fn phase_length_ms(minutes: u32) -> i64 {
    (i64::from(minutes) * MS_PER_MINUTE).max(MIN_PHASE_MS)
}

/// Deadline for a phase of `minutes` starting at `now`.
pub fn deadline_after(now: i64, minutes: u32) -> i64 {
    now.saturating_add(phase_length_ms(minutes))
}
