//! Cached step data and notification bookkeeping

use serde::{Deserialize, Serialize};

use super::newtypes::{DayKey, GoalValue};

/// The authoritative step count cached for one day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepsRecord {
    /// Day this count belongs to
    pub day: DayKey,
    /// Number of steps taken that day
    pub steps: u32,
}

impl StepsRecord {
    /// Creates a new record for `day`
    pub fn new(day: DayKey, steps: u32) -> Self {
        Self { day, steps }
    }

    /// Whether this record meets `goal`
    pub fn reaches(&self, goal: GoalValue) -> bool {
        goal.is_reached_by(self.steps)
    }
}

/// Whether the goal-reached notification already fired for a day
///
/// Deduplicates notification delivery across both paired devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationFlag {
    pub day: DayKey,
    pub sent: bool,
}

impl NotificationFlag {
    /// A flag for a day on which nothing has been sent yet
    pub fn unsent(day: DayKey) -> Self {
        Self { day, sent: false }
    }

    /// A flag for a day whose notification already went out
    pub fn sent(day: DayKey) -> Self {
        Self { day, sent: true }
    }
}
