//! Adapter wiring shared by `duffyd` and the `duffy` CLI
//!
//! Opens the cache, the paired-device link, the health provider and the
//! notifier described by a [`Config`], and builds coordinators over them.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use duffy_cache::{DatabasePool, SqliteStepsCache};
use duffy_core::config::Config;
use duffy_core::ports::{IClock, INotificationService, SystemClock};
use duffy_core::usecases::GoalNotifier;
use duffy_sync::{SyncCoordinator, TcpSyncChannel};

use crate::health::FileHealthProvider;
use crate::notify::connect_notifier;

/// Every adapter a coordinator needs, built from one configuration
pub struct Services {
    pub config: Config,
    pub pool: DatabasePool,
    pub cache: Arc<SqliteStepsCache>,
    pub clock: Arc<dyn IClock>,
    pub channel: Arc<TcpSyncChannel>,
    pub provider: Arc<FileHealthProvider>,
    pub notifier: Arc<dyn INotificationService>,
}

impl Services {
    /// Opens all adapters; must be called inside a Tokio runtime
    pub async fn open(config: Config) -> Result<Self> {
        let pool = DatabasePool::new(&config.cache.database)
            .await
            .context("Failed to open step cache")?;
        let clock: Arc<dyn IClock> = Arc::new(SystemClock);
        let cache = Arc::new(SqliteStepsCache::new(pool.pool().clone(), clock.clone()));

        let channel = Arc::new(
            TcpSyncChannel::from_config(&config.link).context("Failed to set up device link")?,
        );
        let provider = Arc::new(FileHealthProvider::new(config.health.source.clone()));
        let notifier = connect_notifier().await;

        info!(
            device = %config.device.name,
            role = %config.device.role,
            database = %config.cache.database.display(),
            "Services ready"
        );

        Ok(Self {
            config,
            pool,
            cache,
            clock,
            channel,
            provider,
            notifier,
        })
    }

    /// A coordinator over these adapters, ready to be spawned
    pub fn coordinator(&self) -> SyncCoordinator {
        let goal_notifier = GoalNotifier::new(
            self.cache.clone(),
            self.notifier.clone(),
            self.channel.clone(),
        )
        .with_notifications_enabled(self.config.notifications.enabled);

        SyncCoordinator::new(
            self.cache.clone(),
            goal_notifier,
            self.channel.clone(),
            self.clock.clone(),
        )
    }

    /// Flushes the link and closes the database
    pub async fn close(&self) {
        self.channel.shutdown().await;
        self.pool.close().await;
    }
}
