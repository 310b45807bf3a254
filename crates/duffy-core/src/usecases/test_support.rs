//! In-memory port implementations shared by the use case tests

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::{DayKey, GoalValue, NotificationFlag, StepsRecord, SyncMessage};
use crate::ports::{
    HealthError, IClock, IHealthProvider, INotificationService, ISyncChannel, IStepsCache,
    Notification,
};

/// Cache backed by maps, with a switch to simulate storage failure
pub struct MemoryCache {
    clock: Arc<dyn IClock>,
    steps: Mutex<BTreeMap<DayKey, u32>>,
    goal: Mutex<GoalValue>,
    sent: Mutex<HashSet<DayKey>>,
    pub fail: Mutex<bool>,
    /// Flag reads report "not sent", as if another writer marked it just after
    pub stale_flag_reads: Mutex<bool>,
}

impl MemoryCache {
    pub fn new(clock: Arc<dyn IClock>) -> Self {
        Self {
            clock,
            steps: Mutex::new(BTreeMap::new()),
            goal: Mutex::new(GoalValue::UNSET),
            sent: Mutex::new(HashSet::new()),
            fail: Mutex::new(false),
            stale_flag_reads: Mutex::new(false),
        }
    }

    fn check(&self) -> anyhow::Result<()> {
        if *self.fail.lock().unwrap() {
            anyhow::bail!("disk I/O error");
        }
        Ok(())
    }
}

#[async_trait]
impl IStepsCache for MemoryCache {
    async fn get(&self, day: &DayKey) -> anyhow::Result<Option<StepsRecord>> {
        self.check()?;
        Ok(self
            .steps
            .lock()
            .unwrap()
            .get(day)
            .map(|steps| StepsRecord::new(*day, *steps)))
    }

    async fn put(&self, record: &StepsRecord) -> anyhow::Result<()> {
        self.check()?;
        self.steps.lock().unwrap().insert(record.day, record.steps);
        Ok(())
    }

    async fn get_goal(&self) -> anyhow::Result<GoalValue> {
        self.check()?;
        Ok(*self.goal.lock().unwrap())
    }

    async fn set_goal(&self, goal: GoalValue) -> anyhow::Result<()> {
        self.check()?;
        *self.goal.lock().unwrap() = goal;
        Ok(())
    }

    fn is_stale(&self, day: &DayKey) -> bool {
        *day != self.clock.today()
    }

    async fn get_notification_flag(&self, day: &DayKey) -> anyhow::Result<NotificationFlag> {
        self.check()?;
        let sent =
            !*self.stale_flag_reads.lock().unwrap() && self.sent.lock().unwrap().contains(day);
        Ok(NotificationFlag { day: *day, sent })
    }

    async fn mark_notification_sent(&self, day: &DayKey) -> anyhow::Result<()> {
        self.check()?;
        self.sent.lock().unwrap().insert(*day);
        Ok(())
    }

    async fn try_mark_notification_sent(&self, day: &DayKey) -> anyhow::Result<bool> {
        self.check()?;
        Ok(self.sent.lock().unwrap().insert(*day))
    }

    async fn range(&self, from: &DayKey, to: &DayKey) -> anyhow::Result<Vec<StepsRecord>> {
        self.check()?;
        Ok(self
            .steps
            .lock()
            .unwrap()
            .range(*from..=*to)
            .rev()
            .map(|(day, steps)| StepsRecord::new(*day, *steps))
            .collect())
    }

    async fn prune_before(&self, day: &DayKey) -> anyhow::Result<u64> {
        self.check()?;
        let mut steps = self.steps.lock().unwrap();
        let before = steps.len();
        steps.retain(|d, _| d >= day);
        Ok((before - steps.len()) as u64)
    }
}

/// Notifier that records every notification, optionally failing
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
    pub fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl INotificationService for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        if *self.fail.lock().unwrap() {
            anyhow::bail!("notification daemon not running");
        }
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

/// Channel that records what was sent on each delivery path
#[derive(Default)]
pub struct RecordingChannel {
    pub interactive: Mutex<Vec<SyncMessage>>,
    pub background: Mutex<Vec<SyncMessage>>,
}

impl ISyncChannel for RecordingChannel {
    fn send_interactive(&self, message: SyncMessage) {
        self.interactive.lock().unwrap().push(message);
    }

    fn send_background(&self, message: SyncMessage) {
        self.background.lock().unwrap().push(message);
    }
}

/// Provider returning canned data or a canned failure
pub struct StubHealth {
    pub data: BTreeMap<DayKey, u32>,
    pub error: Option<HealthError>,
}

#[async_trait]
impl IHealthProvider for StubHealth {
    async fn fetch_steps(&self, day: DayKey) -> Result<u32, HealthError> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        self.data.get(&day).copied().ok_or(HealthError::NoData(day))
    }

    async fn fetch_range(
        &self,
        from: DayKey,
        to: DayKey,
    ) -> Result<BTreeMap<DayKey, u32>, HealthError> {
        if let Some(e) = &self.error {
            return Err(e.clone());
        }
        Ok(self
            .data
            .range(from..=to)
            .map(|(d, s)| (*d, *s))
            .collect())
    }
}
