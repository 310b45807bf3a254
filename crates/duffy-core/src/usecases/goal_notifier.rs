//! Goal-reached notification use case
//!
//! Decides, after a new step record is cached for today, whether the daily
//! goal notification must fire. The per-day [`NotificationFlag`] is the only
//! guard: once it is marked, no further notification fires for that day on
//! this device, and the paired device is told so it does not fire either.
//!
//! The flag is claimed before the notification is shown. Two coordinators
//! over one store (daemon and a CLI refresh) can both pass the read check,
//! but only one of them wins the claim.
//!
//! [`NotificationFlag`]: crate::domain::NotificationFlag

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::domain::{GoalValue, StepsRecord, SyncMessage};
use crate::ports::{INotificationService, ISyncChannel, IStepsCache, Notification};

/// Whether the counterpart device is told about a fired notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Broadcast {
    /// Send `GoalNotificationSent` over the interactive channel
    ToCounterpart,
    /// Stay silent; the record came from the counterpart in the first place
    Suppressed,
}

/// Result of a goal check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalCheck {
    /// No goal is configured
    NoGoal,
    /// The record is below the goal
    NotReached,
    /// The goal is reached but the notification already went out today
    AlreadySent,
    /// The notification fired and the flag was marked
    Notified { broadcast: bool },
}

impl GoalCheck {
    pub fn notified(&self) -> bool {
        matches!(self, GoalCheck::Notified { .. })
    }
}

/// At-most-once-per-day goal notification
pub struct GoalNotifier {
    cache: Arc<dyn IStepsCache>,
    notifications: Arc<dyn INotificationService>,
    channel: Arc<dyn ISyncChannel>,
    enabled: bool,
}

impl GoalNotifier {
    /// Creates a GoalNotifier with notifications enabled
    ///
    /// # Arguments
    ///
    /// * `cache` - Source of the goal and owner of the per-day flags
    /// * `notifications` - Local notification service
    /// * `channel` - Link to the paired device for `GoalNotificationSent`
    pub fn new(
        cache: Arc<dyn IStepsCache>,
        notifications: Arc<dyn INotificationService>,
        channel: Arc<dyn ISyncChannel>,
    ) -> Self {
        Self {
            cache,
            notifications,
            channel,
            enabled: true,
        }
    }

    /// Turns local display of the notification on or off
    ///
    /// When disabled, the flag is still marked and the counterpart still
    /// informed, so re-enabling later does not produce a late duplicate.
    pub fn with_notifications_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// `record.steps >= goal AND goal > 0 AND NOT flag(record.day).sent`
    pub async fn should_notify(&self, record: &StepsRecord, goal: GoalValue) -> Result<bool> {
        if !record.reaches(goal) {
            return Ok(false);
        }
        let flag = self
            .cache
            .get_notification_flag(&record.day)
            .await
            .context("Failed to read notification flag")?;
        Ok(!flag.sent)
    }

    /// Fires the notification if `record` reaches the cached goal
    ///
    /// The caller is responsible for only passing records for today.
    ///
    /// # Errors
    ///
    /// Returns an error if the goal or flag cannot be read, or if the flag
    /// cannot be marked. A failed notification delivery is logged only.
    pub async fn notify_if_reached(
        &self,
        record: &StepsRecord,
        broadcast: Broadcast,
    ) -> Result<GoalCheck> {
        let goal = self
            .cache
            .get_goal()
            .await
            .context("Failed to read daily goal")?;

        if !goal.is_set() {
            return Ok(GoalCheck::NoGoal);
        }
        if !record.reaches(goal) {
            debug!(day = %record.day, steps = record.steps, goal = %goal, "Goal not reached");
            return Ok(GoalCheck::NotReached);
        }
        if !self.should_notify(record, goal).await? {
            debug!(day = %record.day, "Goal notification already sent today");
            return Ok(GoalCheck::AlreadySent);
        }

        let claimed = self
            .cache
            .try_mark_notification_sent(&record.day)
            .await
            .context("Failed to mark goal notification as sent")?;
        if !claimed {
            debug!(day = %record.day, "Goal notification claimed by another writer");
            return Ok(GoalCheck::AlreadySent);
        }

        if self.enabled {
            if let Err(e) = self
                .notifications
                .notify(&Notification::goal_reached(goal))
                .await
            {
                warn!(day = %record.day, error = %e, "Failed to deliver goal notification");
            }
        }

        let broadcast = broadcast == Broadcast::ToCounterpart;
        if broadcast {
            self.channel
                .send_interactive(SyncMessage::GoalNotificationSent { day: record.day });
        }

        info!(
            day = %record.day,
            steps = record.steps,
            goal = %goal,
            broadcast,
            "Daily goal reached"
        );

        Ok(GoalCheck::Notified { broadcast })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DayKey;
    use crate::ports::FixedClock;
    use crate::usecases::test_support::{MemoryCache, RecordingChannel, RecordingNotifier};

    struct Fixture {
        cache: Arc<MemoryCache>,
        notifier: Arc<RecordingNotifier>,
        channel: Arc<RecordingChannel>,
        goal_notifier: GoalNotifier,
        today: DayKey,
    }

    fn fixture() -> Fixture {
        let today = DayKey::from_ymd(2024, 6, 1).unwrap();
        let clock = Arc::new(FixedClock::new(today));
        let cache = Arc::new(MemoryCache::new(clock));
        let notifier = Arc::new(RecordingNotifier::default());
        let channel = Arc::new(RecordingChannel::default());
        let goal_notifier = GoalNotifier::new(cache.clone(), notifier.clone(), channel.clone());
        Fixture {
            cache,
            notifier,
            channel,
            goal_notifier,
            today,
        }
    }

    #[tokio::test]
    async fn should_notify_false_without_goal() {
        let f = fixture();
        for steps in [0, 1, 50_000, u32::MAX] {
            let record = StepsRecord::new(f.today, steps);
            assert!(!f
                .goal_notifier
                .should_notify(&record, GoalValue::UNSET)
                .await
                .unwrap());
        }
    }

    #[tokio::test]
    async fn should_notify_false_after_mark_even_with_more_steps() {
        let f = fixture();
        let goal = GoalValue::new(10_000);
        let record = StepsRecord::new(f.today, 10_000);
        assert!(f.goal_notifier.should_notify(&record, goal).await.unwrap());

        f.cache.mark_notification_sent(&f.today).await.unwrap();

        let more = StepsRecord::new(f.today, 15_000);
        assert!(!f.goal_notifier.should_notify(&more, goal).await.unwrap());
    }

    #[tokio::test]
    async fn notifies_once_and_broadcasts() {
        let f = fixture();
        f.cache.set_goal(GoalValue::new(10_000)).await.unwrap();
        let record = StepsRecord::new(f.today, 10_500);

        let first = f
            .goal_notifier
            .notify_if_reached(&record, Broadcast::ToCounterpart)
            .await
            .unwrap();
        assert_eq!(first, GoalCheck::Notified { broadcast: true });

        let second = f
            .goal_notifier
            .notify_if_reached(&StepsRecord::new(f.today, 12_000), Broadcast::ToCounterpart)
            .await
            .unwrap();
        assert_eq!(second, GoalCheck::AlreadySent);

        assert_eq!(f.notifier.count(), 1);
        assert_eq!(
            *f.channel.interactive.lock().unwrap(),
            vec![SyncMessage::GoalNotificationSent { day: f.today }]
        );
        assert!(f.channel.background.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn suppressed_broadcast_sends_nothing() {
        let f = fixture();
        f.cache.set_goal(GoalValue::new(100)).await.unwrap();

        let check = f
            .goal_notifier
            .notify_if_reached(&StepsRecord::new(f.today, 100), Broadcast::Suppressed)
            .await
            .unwrap();

        assert_eq!(check, GoalCheck::Notified { broadcast: false });
        assert_eq!(f.notifier.count(), 1);
        assert!(f.channel.interactive.lock().unwrap().is_empty());
        assert!(f.cache.get_notification_flag(&f.today).await.unwrap().sent);
    }

    #[tokio::test]
    async fn below_goal_and_no_goal() {
        let f = fixture();
        let record = StepsRecord::new(f.today, 5_000);
        assert_eq!(
            f.goal_notifier
                .notify_if_reached(&record, Broadcast::ToCounterpart)
                .await
                .unwrap(),
            GoalCheck::NoGoal
        );

        f.cache.set_goal(GoalValue::new(10_000)).await.unwrap();
        assert_eq!(
            f.goal_notifier
                .notify_if_reached(&record, Broadcast::ToCounterpart)
                .await
                .unwrap(),
            GoalCheck::NotReached
        );
        assert_eq!(f.notifier.count(), 0);
        assert!(!f.cache.get_notification_flag(&f.today).await.unwrap().sent);
    }

    #[tokio::test]
    async fn delivery_failure_still_marks_flag() {
        let f = fixture();
        f.cache.set_goal(GoalValue::new(10)).await.unwrap();
        *f.notifier.fail.lock().unwrap() = true;

        let check = f
            .goal_notifier
            .notify_if_reached(&StepsRecord::new(f.today, 20), Broadcast::ToCounterpart)
            .await
            .unwrap();

        assert!(check.notified());
        assert!(f.cache.get_notification_flag(&f.today).await.unwrap().sent);
    }

    #[tokio::test]
    async fn disabled_notifications_mark_without_showing() {
        let f = fixture();
        let goal_notifier =
            GoalNotifier::new(f.cache.clone(), f.notifier.clone(), f.channel.clone())
                .with_notifications_enabled(false);
        f.cache.set_goal(GoalValue::new(10)).await.unwrap();

        let check = goal_notifier
            .notify_if_reached(&StepsRecord::new(f.today, 20), Broadcast::ToCounterpart)
            .await
            .unwrap();

        assert!(check.notified());
        assert_eq!(f.notifier.count(), 0);
        assert_eq!(f.channel.interactive.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lost_claim_does_not_notify() {
        let f = fixture();
        f.cache.set_goal(GoalValue::new(10)).await.unwrap();
        f.cache.mark_notification_sent(&f.today).await.unwrap();
        *f.cache.stale_flag_reads.lock().unwrap() = true;

        let check = f
            .goal_notifier
            .notify_if_reached(&StepsRecord::new(f.today, 20), Broadcast::ToCounterpart)
            .await
            .unwrap();

        assert_eq!(check, GoalCheck::AlreadySent);
        assert_eq!(f.notifier.count(), 0);
        assert!(f.channel.interactive.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn storage_failure_is_reported() {
        let f = fixture();
        *f.cache.fail.lock().unwrap() = true;

        let result = f
            .goal_notifier
            .notify_if_reached(&StepsRecord::new(f.today, 20), Broadcast::ToCounterpart)
            .await;
        assert!(result.is_err());
        assert_eq!(f.notifier.count(), 0);
    }
}
