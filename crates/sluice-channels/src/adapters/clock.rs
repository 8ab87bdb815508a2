use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use sluice_core::config::SECONDS_PER_DAY;

use crate::traits::Clock;

/// Host-driven clock, typically a block height pushed in by the environment.
///
/// Never moves backwards: `set` ignores values below the current tick.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Advance by `ticks` and return the new time.
    pub fn advance(&self, ticks: u64) -> u64 {
        let mut current = self.now.load(Ordering::SeqCst);
        loop {
            let next = current.saturating_add(ticks);
            match self
                .now
                .compare_exchange(current, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    /// Move to `tick` if it is not in the past. Returns the resulting time.
    pub fn set(&self, tick: u64) -> u64 {
        self.now.fetch_max(tick, Ordering::SeqCst).max(tick)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Wall clock in whole seconds since the UNIX epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        Utc::now().timestamp().max(0) as u64
    }

    fn ticks_per_day(&self) -> u64 {
        SECONDS_PER_DAY
    }
}
