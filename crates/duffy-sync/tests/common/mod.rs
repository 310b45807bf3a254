//! Shared fixtures for duffy-sync integration tests
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use duffy_cache::{DatabasePool, SqliteStepsCache};
use duffy_core::domain::{DayKey, SyncMessage};
use duffy_core::ports::{
    FixedClock, HealthError, IHealthProvider, INotificationService, ISyncChannel, Notification,
};
use duffy_core::usecases::GoalNotifier;
use duffy_sync::{CoordinatorHandle, InboundSink, SyncCoordinator};

pub fn today() -> DayKey {
    DayKey::from_ymd(2024, 6, 10).unwrap()
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl INotificationService for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

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

#[derive(Default)]
pub struct RecordingSink {
    pub received: Mutex<Vec<SyncMessage>>,
}

#[async_trait]
impl InboundSink for RecordingSink {
    async fn on_receive(&self, message: SyncMessage) {
        self.received.lock().unwrap().push(message);
    }
}

pub struct StubProvider {
    pub result: Result<BTreeMap<DayKey, u32>, HealthError>,
}

#[async_trait]
impl IHealthProvider for StubProvider {
    async fn fetch_steps(&self, day: DayKey) -> Result<u32, HealthError> {
        match &self.result {
            Ok(data) => data.get(&day).copied().ok_or(HealthError::NoData(day)),
            Err(e) => Err(e.clone()),
        }
    }

    async fn fetch_range(
        &self,
        from: DayKey,
        to: DayKey,
    ) -> Result<BTreeMap<DayKey, u32>, HealthError> {
        match &self.result {
            Ok(data) => Ok(data.range(from..=to).map(|(d, s)| (*d, *s)).collect()),
            Err(e) => Err(e.clone()),
        }
    }
}

/// One device: SQLite cache, recorders, and a running coordinator
pub struct Device {
    pub cache: Arc<SqliteStepsCache>,
    pub clock: Arc<FixedClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub channel: Arc<RecordingChannel>,
    pub handle: CoordinatorHandle,
}

pub async fn device() -> Device {
    device_on(DatabasePool::in_memory().await.unwrap())
}

/// A device over its own pool; several can share one database file
pub fn device_on(pool: DatabasePool) -> Device {
    let clock = Arc::new(FixedClock::new(today()));
    let cache = Arc::new(SqliteStepsCache::new(pool.pool().clone(), clock.clone()));
    let notifier = Arc::new(RecordingNotifier::default());
    let channel = Arc::new(RecordingChannel::default());

    let goal_notifier = GoalNotifier::new(cache.clone(), notifier.clone(), channel.clone());
    let coordinator =
        SyncCoordinator::new(cache.clone(), goal_notifier, channel.clone(), clock.clone());
    let (handle, _task) = coordinator.spawn(16);

    Device {
        cache,
        clock,
        notifier,
        channel,
        handle,
    }
}
