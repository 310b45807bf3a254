//! Steps cache port (driven/secondary port)
//!
//! This module defines the interface for persisting the step records,
//! the shared daily goal and the per-day notification flags.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, files, memory) and only ever surface as "storage failure".
//! - Every write is a single key overwrite; no transactions are needed as
//!   long as writes are serialized by the caller.
//! - [`IStepsCache::try_mark_notification_sent`] is the exception: it must
//!   be atomic even against other processes sharing the same store, since
//!   the daemon and one-shot CLI commands each run their own coordinator.
//! - `is_stale` is synchronous: it only compares a day with the clock.

use crate::domain::{DayKey, GoalValue, NotificationFlag, StepsRecord};

/// Port trait for the local steps cache
#[async_trait::async_trait]
pub trait IStepsCache: Send + Sync {
    /// Returns the record cached for `day`, if any
    async fn get(&self, day: &DayKey) -> anyhow::Result<Option<StepsRecord>>;

    /// Stores `record`, overwriting any existing record for that day
    async fn put(&self, record: &StepsRecord) -> anyhow::Result<()>;

    /// Returns the shared daily goal ([`GoalValue::UNSET`] when never set)
    async fn get_goal(&self) -> anyhow::Result<GoalValue>;

    /// Stores the shared daily goal
    async fn set_goal(&self, goal: GoalValue) -> anyhow::Result<()>;

    /// Whether `day` is not the current calendar day
    fn is_stale(&self, day: &DayKey) -> bool;

    /// Returns the notification flag for `day` (`sent = false` when never marked)
    async fn get_notification_flag(&self, day: &DayKey) -> anyhow::Result<NotificationFlag>;

    /// Records that the goal notification went out for `day`
    async fn mark_notification_sent(&self, day: &DayKey) -> anyhow::Result<()>;

    /// Marks the flag for `day` unless it is already marked
    ///
    /// Returns `true` only for the caller that changed the flag; that caller
    /// owns the notification for the day.
    async fn try_mark_notification_sent(&self, day: &DayKey) -> anyhow::Result<bool>;

    /// Cached records with `from <= day <= to`, newest first
    async fn range(&self, from: &DayKey, to: &DayKey) -> anyhow::Result<Vec<StepsRecord>>;

    /// Deletes records and flags older than `day`, returning how many rows went
    async fn prune_before(&self, day: &DayKey) -> anyhow::Result<u64>;
}
