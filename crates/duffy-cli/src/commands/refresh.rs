//! Refresh command - One-shot fetch of today's steps
//!
//! Runs the same path as the daemon's refresh loop: the health export is
//! read, the value goes through the coordinator (cache, goal check,
//! background snapshot to the paired device) and the link is flushed
//! before exiting.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use duffy_daemon::Services;
use duffy_sync::{refresh_today, RefreshOutcome};

use super::CliContext;
use crate::output::{get_formatter, steps, OutputFormat};

#[derive(Debug, Args)]
pub struct RefreshCommand {}

impl RefreshCommand {
    pub async fn execute(&self, format: OutputFormat, ctx: &CliContext) -> Result<()> {
        let formatter = get_formatter(format);

        let services = Services::open(ctx.config.clone()).await?;
        let (handle, task) = services.coordinator().spawn(ctx.config.mailbox.capacity);

        let result = refresh_today(
            services.provider.as_ref(),
            &handle,
            services.clock.as_ref(),
        )
        .await
        .context("Failed to record today's steps");

        drop(handle);
        task.await.context("Coordinator task failed")?;
        services.close().await;
        let outcome = result?;

        info!(fetched = outcome.is_fetched(), "Refresh finished");

        if format.is_json() {
            formatter.print_json(&outcome_json(&outcome));
            return Ok(());
        }

        match outcome {
            RefreshOutcome::Fetched(fetched) => {
                formatter.success(&format!(
                    "{} steps recorded for {}",
                    steps(fetched.record.steps),
                    fetched.record.day
                ));
                if fetched.notified {
                    formatter.info("Daily goal reached, notification shown");
                }
            }
            RefreshOutcome::Skipped { day, reason } => {
                formatter.warn(&format!("No steps recorded for {}: {}", day, reason));
            }
        }
        Ok(())
    }
}

fn outcome_json(outcome: &RefreshOutcome) -> serde_json::Value {
    match outcome {
        RefreshOutcome::Fetched(fetched) => serde_json::json!({
            "fetched": true,
            "day": fetched.record.day,
            "steps": fetched.record.steps,
            "notified": fetched.notified,
            "broadcast": fetched.broadcast,
        }),
        RefreshOutcome::Skipped { day, reason } => serde_json::json!({
            "fetched": false,
            "day": day,
            "reason": reason.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duffy_core::domain::{DayKey, StepsRecord};
    use duffy_core::ports::IStepsCache;
    use duffy_sync::{FetchOutcome, SyncError};

    #[test]
    fn test_outcome_json_fetched() {
        let day = DayKey::from_ymd(2024, 6, 10).unwrap();
        let json = outcome_json(&RefreshOutcome::Fetched(FetchOutcome {
            record: StepsRecord::new(day, 10_200),
            is_today: true,
            notified: true,
            broadcast: true,
        }));
        assert_eq!(json["fetched"], true);
        assert_eq!(json["day"], "2024-06-10");
        assert_eq!(json["steps"], 10_200);
        assert_eq!(json["notified"], true);
    }

    #[test]
    fn test_outcome_json_skipped() {
        let day = DayKey::from_ymd(2024, 6, 10).unwrap();
        let json = outcome_json(&RefreshOutcome::Skipped {
            day,
            reason: SyncError::StaleData(day),
        });
        assert_eq!(json["fetched"], false);
        assert!(json["reason"].as_str().unwrap().contains("2024-06-10"));
    }

    #[tokio::test]
    async fn test_refresh_records_exported_steps() {
        let dir = tempfile::tempdir().unwrap();
        let today = DayKey::today_local();
        let export = dir.path().join("steps.json");
        std::fs::write(&export, format!(r#"{{"{}": 4321}}"#, today)).unwrap();

        let config = duffy_core::config::ConfigBuilder::new()
            .link_enabled(false)
            .cache_database(dir.path().join("duffy.db"))
            .health_source(export)
            .notifications_enabled(false)
            .build();
        let ctx = CliContext::new(dir.path().join("config.yaml"), config);

        RefreshCommand {}
            .execute(OutputFormat::Json, &ctx)
            .await
            .unwrap();

        let (pool, cache) = ctx.open_cache().await.unwrap();
        assert_eq!(
            cache.get(&today).await.unwrap(),
            Some(StepsRecord::new(today, 4321))
        );
        pool.close().await;
    }
}
