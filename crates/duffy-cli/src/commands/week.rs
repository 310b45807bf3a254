//! Week command - Step counts for the past week
//!
//! Reads the health export for the last seven days plus today, newest
//! first. If the export cannot be read the cached records are shown.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use duffy_core::ports::{IClock, SystemClock};
use duffy_core::usecases::{WeekSource, WeekSummary, WeekSummaryUseCase};
use duffy_daemon::FileHealthProvider;

use super::CliContext;
use crate::output::{get_formatter, steps, OutputFormat};

#[derive(Debug, Args)]
pub struct WeekCommand {}

impl WeekCommand {
    pub async fn execute(&self, format: OutputFormat, ctx: &CliContext) -> Result<()> {
        let formatter = get_formatter(format);

        let (pool, cache) = ctx.open_cache().await?;
        let provider = Arc::new(FileHealthProvider::new(ctx.config.health.source.clone()));
        let clock: Arc<dyn IClock> = Arc::new(SystemClock);

        let summary = WeekSummaryUseCase::new(provider, cache, clock)
            .summary()
            .await
            .context("Failed to build week summary")?;
        pool.close().await;

        info!(days = summary.days.len(), source = ?summary.source, "Showing week");

        if format.is_json() {
            let json =
                serde_json::to_value(&summary).context("Failed to serialize week to JSON")?;
            formatter.print_json(&json);
            return Ok(());
        }

        if summary.source == WeekSource::Cache {
            formatter.warn("Health data unavailable, showing cached steps");
        }
        if summary.days.is_empty() {
            formatter.info("No step data for the past week");
            return Ok(());
        }

        formatter.success("Steps for the past week");
        for line in week_lines(&summary) {
            formatter.info(&line);
        }
        Ok(())
    }
}

fn week_lines(summary: &WeekSummary) -> Vec<String> {
    summary
        .days
        .iter()
        .map(|row| {
            let marker = if row.goal_reached { "  \u{2713}" } else { "" };
            format!("{}  {:>8}{}", row.day, steps(row.steps), marker)
        })
        .collect()
}
