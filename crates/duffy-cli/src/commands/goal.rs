//! Goal command - Change the daily step goal
//!
//! Stores the goal locally and sends it to the paired device as an
//! interactive message. If the counterpart is unreachable the message is
//! dropped; the local change stands.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use duffy_core::domain::GoalValue;
use duffy_daemon::Services;

use super::CliContext;
use crate::output::{get_formatter, steps, OutputFormat};

#[derive(Debug, Args)]
pub struct GoalCommand {
    /// New daily goal in steps (0 clears it)
    pub steps: u32,
}

impl GoalCommand {
    pub async fn execute(&self, format: OutputFormat, ctx: &CliContext) -> Result<()> {
        let formatter = get_formatter(format);
        let goal = GoalValue::new(self.steps);

        let services = Services::open(ctx.config.clone()).await?;
        let (handle, task) = services.coordinator().spawn(ctx.config.mailbox.capacity);

        let result = handle
            .change_goal(goal)
            .await
            .context("Failed to change daily goal");

        drop(handle);
        task.await.context("Coordinator task failed")?;
        services.close().await;
        result?;

        info!(goal = goal.steps(), "Daily goal changed");

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "goal": goal,
                "link_enabled": services.channel.is_enabled(),
            }));
        } else if goal.is_set() {
            formatter.success(&format!("Daily goal set to {} steps", steps(goal.steps())));
        } else {
            formatter.success("Daily goal cleared");
        }
        Ok(())
    }
}
