//! Clock port
//!
//! Staleness and "is this record for today" decisions depend on the
//! device-local calendar day. Injecting the clock keeps those decisions
//! testable.

use std::sync::Mutex;

use crate::domain::DayKey;

/// Port trait for reading the current calendar day
pub trait IClock: Send + Sync {
    /// The current calendar day on this device
    fn today(&self) -> DayKey;
}

/// Clock backed by the system's local time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl IClock for SystemClock {
    fn today(&self) -> DayKey {
        DayKey::today_local()
    }
}

/// Clock pinned to a given day, advanced manually
///
/// Used by tests and by one-shot tools that evaluate a specific day.
#[derive(Debug)]
pub struct FixedClock {
    day: Mutex<DayKey>,
}

impl FixedClock {
    pub fn new(day: DayKey) -> Self {
        Self {
            day: Mutex::new(day),
        }
    }

    /// Moves the clock to `day`
    pub fn set(&self, day: DayKey) {
        if let Ok(mut guard) = self.day.lock() {
            *guard = day;
        }
    }
}

impl IClock for FixedClock {
    fn today(&self) -> DayKey {
        match self.day.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
