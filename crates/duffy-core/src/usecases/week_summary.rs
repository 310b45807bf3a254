//! Past-week step summary
//!
//! Lists the last seven days plus today, newest first. The health provider
//! is the primary source; when it fails, whatever the cache holds for the
//! same window is shown instead.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::warn;

use crate::domain::{DayKey, GoalValue};
use crate::ports::{IClock, IHealthProvider, IStepsCache};

/// Days before today included in the summary
pub const WEEK_DAYS: u32 = 7;

/// One row of the week summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DaySteps {
    pub day: DayKey,
    pub steps: u32,
    pub goal_reached: bool,
}

/// Where the summary's numbers came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekSource {
    Provider,
    Cache,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekSummary {
    pub source: WeekSource,
    pub goal: GoalValue,
    /// Newest first
    pub days: Vec<DaySteps>,
}

pub struct WeekSummaryUseCase {
    provider: Arc<dyn IHealthProvider>,
    cache: Arc<dyn IStepsCache>,
    clock: Arc<dyn IClock>,
}

impl WeekSummaryUseCase {
    pub fn new(
        provider: Arc<dyn IHealthProvider>,
        cache: Arc<dyn IStepsCache>,
        clock: Arc<dyn IClock>,
    ) -> Self {
        Self {
            provider,
            cache,
            clock,
        }
    }

    /// Builds the summary for the week ending today
    ///
    /// When the provider answers but has no data at all, the summary is
    /// empty rather than a column of zeros.
    pub async fn summary(&self) -> Result<WeekSummary> {
        let today = self.clock.today();
        let from = today.days_before(WEEK_DAYS);
        let goal = self
            .cache
            .get_goal()
            .await
            .context("Failed to read daily goal")?;

        let row = |day: DayKey, steps: u32| DaySteps {
            day,
            steps,
            goal_reached: goal.is_reached_by(steps),
        };

        match self.provider.fetch_range(from, today).await {
            Ok(collection) => {
                let mut days = Vec::new();
                if !collection.is_empty() {
                    for day in from.through(&today).into_iter().rev() {
                        days.push(row(day, collection.get(&day).copied().unwrap_or(0)));
                    }
                }
                Ok(WeekSummary {
                    source: WeekSource::Provider,
                    goal,
                    days,
                })
            }
            Err(e) => {
                warn!(error = %e, "Health provider failed, showing cached week");
                let cached = self
                    .cache
                    .range(&from, &today)
                    .await
                    .context("Failed to read cached week")?;
                Ok(WeekSummary {
                    source: WeekSource::Cache,
                    goal,
                    days: cached.iter().map(|r| row(r.day, r.steps)).collect(),
                })
            }
        }
    }
}
