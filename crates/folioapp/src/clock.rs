//! Time source for everything that stamps or schedules.
//!
//! Envelope timestamps, backup keys and the history debounce window all read the
//! time through a [`Clock`], so tests can drive time explicitly with [`ManualClock`].

use chrono::{DateTime, Duration, Utc};
use std::cell::Cell;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Cell<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_millis(&self, millis: i64) {
        self.advance(Duration::milliseconds(millis));
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.now.set(at);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        // 2024-01-01T00:00:00Z
        Self::new(DateTime::from_timestamp(1_704_067_200, 0).unwrap_or_default())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}
