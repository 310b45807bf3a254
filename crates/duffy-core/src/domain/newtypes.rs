//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for the values that travel
//! between the cache, the paired device and the notifier. Each newtype
//! ensures validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{Days, Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Canonical text format of a [`DayKey`]
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// DayKey
// ============================================================================

/// A calendar day identifier
///
/// Used as the cache key and as the wire identity for "which day does this
/// step count belong to". Serialized as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DayKey(NaiveDate);

impl DayKey {
    /// Create a DayKey from a calendar date
    #[must_use]
    pub const fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Create a DayKey from year, month and day components
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, DomainError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| DomainError::InvalidDayKey(format!("{year:04}-{month:02}-{day:02}")))
    }

    /// The current calendar day according to the device-local clock
    #[must_use]
    pub fn today_local() -> Self {
        Self(Local::now().date_naive())
    }

    /// Get the inner calendar date
    #[must_use]
    pub const fn as_date(&self) -> NaiveDate {
        self.0
    }

    /// The day `days` calendar days before this one, clamped to the
    /// earliest representable date
    #[must_use]
    pub fn days_before(&self, days: u32) -> Self {
        self.checked_days_before(days).unwrap_or(Self(NaiveDate::MIN))
    }

    /// The day `days` calendar days before this one; `None` on overflow
    pub fn checked_days_before(&self, days: u32) -> Option<Self> {
        self.0.checked_sub_days(Days::new(u64::from(days))).map(Self)
    }

    /// The previous calendar day
    #[must_use]
    pub fn previous(&self) -> Self {
        self.days_before(1)
    }

    /// The next calendar day
    #[must_use]
    pub fn next(&self) -> Self {
        Self(self.0 + Duration::days(1))
    }

    /// Inclusive list of days from `self` to `to`, oldest first
    ///
    /// Empty when `to` is before `self`.
    pub fn through(&self, to: &DayKey) -> Vec<DayKey> {
        let mut days = Vec::new();
        let mut current = *self;
        while current <= *to {
            days.push(current);
            current = current.next();
        }
        days
    }
}

impl Display for DayKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_KEY_FORMAT))
    }
}

impl FromStr for DayKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // chrono accepts unpadded fields; the canonical form is fixed-width
        if s.len() != 10 {
            return Err(DomainError::InvalidDayKey(s.to_string()));
        }
        NaiveDate::parse_from_str(s, DAY_KEY_FORMAT)
            .map(Self)
            .map_err(|_| DomainError::InvalidDayKey(s.to_string()))
    }
}

impl TryFrom<String> for DayKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DayKey> for String {
    fn from(day: DayKey) -> Self {
        day.to_string()
    }
}

impl From<NaiveDate> for DayKey {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

// ============================================================================
// GoalValue
// ============================================================================

/// The daily step goal shared between paired devices
///
/// Zero means "no goal set"; an unset goal is never reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalValue(u32);

impl GoalValue {
    /// The "no goal set" value
    pub const UNSET: GoalValue = GoalValue(0);

    /// Create a goal from a step count
    #[must_use]
    pub const fn new(steps: u32) -> Self {
        Self(steps)
    }

    /// The goal in steps
    #[must_use]
    pub const fn steps(&self) -> u32 {
        self.0
    }

    /// Whether a goal has been configured
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.0 > 0
    }

    /// Whether `steps` meets a configured goal
    #[must_use]
    pub const fn is_reached_by(&self, steps: u32) -> bool {
        self.is_set() && steps >= self.0
    }
}

impl Display for GoalValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for GoalValue {
    fn from(steps: u32) -> Self {
        Self(steps)
    }
}

impl TryFrom<i64> for GoalValue {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| DomainError::InvalidGoal(value.to_string()))
    }
}

/// Validate a raw integer step count coming from storage or the wire
pub fn steps_from_i64(value: i64) -> Result<u32, DomainError> {
    u32::try_from(value).map_err(|_| DomainError::InvalidSteps(value.to_string()))
}
