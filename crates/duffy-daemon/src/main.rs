//! Duffy Daemon - Background step synchronization service
//!
//! This binary runs as a user service and handles:
//! - Periodic refresh of today's step count from the health provider
//! - Receiving goal, notification and step updates from the paired device
//! - The once-per-day goal notification
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! All cache mutation goes through the sync coordinator's mailbox. The
//! link listener feeds it inbound messages, the refresh loop feeds it
//! local fetches. A `CancellationToken` triggered on SIGTERM or SIGINT
//! stops both, after which the link gets a final flush.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use duffy_core::config::Config;
use duffy_core::domain::DayKey;
use duffy_core::ports::IStepsCache;
use duffy_core::usecases::week_summary::WEEK_DAYS;
use duffy_daemon::{logging, Services};
use duffy_sync::{refresh_today, CoordinatorHandle, LinkListener, RefreshOutcome};

/// Main daemon service that wires the coordinator to its inputs
struct DaemonService {
    services: Services,
    /// Token for signalling graceful shutdown to all async tasks
    shutdown: CancellationToken,
}

impl DaemonService {
    /// Opens the cache, link and adapters described by `config`
    async fn new(config: Config, shutdown: CancellationToken) -> Result<Self> {
        let services = Services::open(config).await?;
        Ok(Self { services, shutdown })
    }

    /// Runs until the shutdown token is cancelled
    ///
    /// 1. Prunes records older than the retention window
    /// 2. Spawns the coordinator mailbox
    /// 3. Starts the link listener
    /// 4. Enters the refresh loop
    async fn run(&self) -> Result<()> {
        self.prune().await;

        let config = &self.services.config;
        let (handle, coordinator_task) = self
            .services
            .coordinator()
            .spawn(config.mailbox.capacity);

        let listener_task = if config.link.enabled {
            let listener = LinkListener::bind(&config.link.listen, Arc::new(handle.clone()))
                .await
                .context("Failed to start link listener")?;
            Some(tokio::spawn(listener.run(self.shutdown.child_token())))
        } else {
            None
        };

        self.refresh_loop(&handle).await;

        if let Some(task) = listener_task {
            if let Err(e) = task.await {
                warn!(error = %e, "Link listener task failed");
            }
        }
        drop(handle);
        if let Err(e) = coordinator_task.await {
            warn!(error = %e, "Coordinator task failed");
        }

        self.services.close().await;
        Ok(())
    }

    async fn prune(&self) {
        let retention = self.services.config.cache.retention_days;
        let Some(cutoff) = prune_cutoff(self.services.clock.today(), retention) else {
            debug!(
                retention_days = retention,
                "Retention reaches past the calendar, nothing to prune"
            );
            return;
        };
        match self.services.cache.prune_before(&cutoff).await {
            Ok(removed) => debug!(cutoff = %cutoff, removed, "Cache pruned"),
            Err(e) => warn!(error = %e, "Failed to prune old step records"),
        }
    }

    /// Fetches today's steps every `health.poll_interval` seconds
    async fn refresh_loop(&self, handle: &CoordinatorHandle) {
        let poll_secs = self.services.config.health.poll_interval.max(1);
        info!(poll_interval_secs = poll_secs, "Starting refresh loop");

        let mut interval = tokio::time::interval(Duration::from_secs(poll_secs));

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
            }

            match refresh_today(
                self.services.provider.as_ref(),
                handle,
                self.services.clock.as_ref(),
            )
            .await
            {
                Ok(RefreshOutcome::Fetched(outcome)) => debug!(
                    day = %outcome.record.day,
                    steps = outcome.record.steps,
                    notified = outcome.notified,
                    "Refresh completed"
                ),
                Ok(RefreshOutcome::Skipped { day, reason }) => {
                    debug!(day = %day, reason = %reason, "Refresh skipped")
                }
                Err(e) => error!(error = %e, "Refresh failed"),
            }
        }

        info!("Refresh loop terminated");
    }
}

/// Oldest day kept; retention never goes below the week view
fn prune_cutoff(today: DayKey, retention_days: u32) -> Option<DayKey> {
    today.checked_days_before(retention_days.max(WEEK_DAYS))
}

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

/// `$DUFFY_CONFIG` when set, the default location otherwise
fn load_config() -> (PathBuf, Config) {
    let path = std::env::var_os("DUFFY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&path);
    (path, config)
}

/// Logs every problem; only unusable link addresses are fatal
fn check_config(config: &Config) -> Result<()> {
    let errors = config.validate();
    for e in &errors {
        warn!(field = %e.field, message = %e.message, "Configuration problem");
    }
    if let Some(e) = errors
        .iter()
        .find(|e| e.field == "link.listen" || e.field == "link.peer")
    {
        anyhow::bail!("Invalid link configuration: {}", e);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let (config_path, config) = load_config();
    logging::init(&config.logging, &config.logging.level, true);

    info!(
        config_path = %config_path.display(),
        device = %config.device.name,
        "Duffy daemon starting (duffyd)"
    );
    check_config(&config)?;

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(config, shutdown_token.clone()).await?;
    let result = service.run().await;

    match &result {
        Ok(()) => info!("Duffy daemon shut down gracefully"),
        Err(e) => error!(error = %e, "Duffy daemon exiting with error"),
    }

    result
}
