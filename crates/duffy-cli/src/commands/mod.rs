//! CLI subcommands
//!
//! Every command receives the output format and the [`CliContext`] built
//! once in `main` from `--config`.

pub mod config;
pub mod goal;
pub mod refresh;
pub mod status;
pub mod week;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use duffy_cache::{DatabasePool, SqliteStepsCache};
use duffy_core::config::Config;
use duffy_core::ports::{IClock, SystemClock};

/// Configuration the command runs against
pub struct CliContext {
    pub config_path: PathBuf,
    pub config: Config,
}

impl CliContext {
    pub fn new(config_path: PathBuf, config: Config) -> Self {
        Self {
            config_path,
            config,
        }
    }

    /// Opens the step cache without the link or notifier
    pub async fn open_cache(&self) -> Result<(DatabasePool, Arc<SqliteStepsCache>)> {
        let pool = DatabasePool::new(&self.config.cache.database)
            .await
            .context("Failed to open step cache")?;
        let clock: Arc<dyn IClock> = Arc::new(SystemClock);
        let cache = Arc::new(SqliteStepsCache::new(pool.pool().clone(), clock));
        Ok((pool, cache))
    }
}
