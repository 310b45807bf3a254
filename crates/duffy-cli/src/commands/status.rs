//! Status command - Today's cached step count
//!
//! Shows the steps cached for today, the daily goal and whether today's
//! goal notification has gone out. A record from an earlier day is shown
//! as zero, marked stale.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use duffy_core::ports::{IClock, SystemClock};
use duffy_core::usecases::{StepsDisplay, TodayStepsUseCase, TodaySummary};

use super::CliContext;
use crate::output::{get_formatter, steps, OutputFormat};

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, format: OutputFormat, ctx: &CliContext) -> Result<()> {
        let formatter = get_formatter(format);
        let database = &ctx.config.cache.database;

        if !database.exists() {
            formatter.error("No step cache found. Start duffyd or run 'duffy refresh' first.");
            return Ok(());
        }

        let (pool, cache) = ctx.open_cache().await?;
        let clock: Arc<dyn IClock> = Arc::new(SystemClock);
        let summary = TodayStepsUseCase::new(cache, clock)
            .summary()
            .await
            .context("Failed to read today's status")?;
        pool.close().await;

        info!(day = %summary.today, steps = summary.display.steps(), "Showing status");

        if format.is_json() {
            let json =
                serde_json::to_value(summary).context("Failed to serialize status to JSON")?;
            formatter.print_json(&json);
            return Ok(());
        }

        formatter.success(&format!("Steps for {}", summary.today));
        for line in status_lines(&summary) {
            formatter.info(&line);
        }
        Ok(())
    }
}

fn status_lines(summary: &TodaySummary) -> Vec<String> {
    let mut lines = Vec::new();

    match summary.display {
        StepsDisplay::Fresh { record } => {
            lines.push(format!("Steps:        {}", steps(record.steps)));
        }
        StepsDisplay::Stale { cached, .. } => {
            lines.push(format!("Steps:        0 (stale, last cached {})", cached.day));
        }
        StepsDisplay::Missing { .. } => {
            lines.push("Steps:        0 (no data)".to_string());
        }
    }

    if summary.goal.is_set() {
        let marker = if summary.goal_reached() { " (reached)" } else { "" };
        lines.push(format!("Goal:         {}{}", steps(summary.goal.steps()), marker));
    } else {
        lines.push("Goal:         not set".to_string());
    }

    lines.push(format!(
        "Notification: {}",
        if summary.notification_sent {
            "sent"
        } else {
            "not sent"
        }
    ));
    lines
}
