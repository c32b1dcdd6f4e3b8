//! Wall-clock source for the engine.
//!
//! Every "today" decision (local screenshot filtering, default titles, the
//! in-memory backend's daily totals) goes through a single [`Clock`] so the
//! device's local calendar day is the one timezone authority.

use chrono::{DateTime, Duration, Local, NaiveDate};
use std::sync::{Arc, Mutex};

/// Source of the current local time.
pub trait Clock: Send + Sync {
    /// Current moment in the device's local timezone.
    fn now(&self) -> DateTime<Local>;

    /// Current calendar day in the device's local timezone.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same underlying instant, so a test can hand one clone to
/// the backend and keep another to advance time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Local>>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }

    /// Jumps the clock to `to`.
    pub fn set(&self, to: DateTime<Local>) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
