//! Today's step count for display
//!
//! A cached value from a previous day is never shown as today's count:
//! stale or missing data displays as zero.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::{DayKey, GoalValue, StepsRecord};
use crate::ports::{IClock, IStepsCache};

/// How far back the cache is searched for the latest (stale) record
const STALE_LOOKBACK_DAYS: u32 = 7;

/// Cached step data as it should be shown for today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StepsDisplay {
    /// A record for today exists
    Fresh { record: StepsRecord },
    /// The newest cached record belongs to an earlier day
    Stale { cached: StepsRecord, today: DayKey },
    /// Nothing cached recently
    Missing { today: DayKey },
}

impl StepsDisplay {
    /// Steps to display; zero unless the record is for today
    pub fn steps(&self) -> u32 {
        match self {
            StepsDisplay::Fresh { record } => record.steps,
            StepsDisplay::Stale { .. } | StepsDisplay::Missing { .. } => 0,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, StepsDisplay::Fresh { .. })
    }
}

/// Everything the status view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TodaySummary {
    pub today: DayKey,
    pub display: StepsDisplay,
    pub goal: GoalValue,
    pub notification_sent: bool,
}

impl TodaySummary {
    pub fn goal_reached(&self) -> bool {
        self.goal.is_reached_by(self.display.steps())
    }
}

/// Reads today's cached state
pub struct TodayStepsUseCase {
    cache: Arc<dyn IStepsCache>,
    clock: Arc<dyn IClock>,
}

impl TodayStepsUseCase {
    pub fn new(cache: Arc<dyn IStepsCache>, clock: Arc<dyn IClock>) -> Self {
        Self { cache, clock }
    }

    /// Today's steps, falling back to a stale marker or zero
    pub async fn display(&self) -> Result<StepsDisplay> {
        let today = self.clock.today();

        if let Some(record) = self
            .cache
            .get(&today)
            .await
            .context("Failed to read today's steps from cache")?
        {
            return Ok(StepsDisplay::Fresh { record });
        }

        let recent = self
            .cache
            .range(&today.days_before(STALE_LOOKBACK_DAYS), &today)
            .await
            .context("Failed to read recent steps from cache")?;

        Ok(match recent.first() {
            Some(cached) if self.cache.is_stale(&cached.day) => StepsDisplay::Stale {
                cached: *cached,
                today,
            },
            Some(record) => StepsDisplay::Fresh { record: *record },
            None => StepsDisplay::Missing { today },
        })
    }

    /// Display value plus goal and today's notification flag
    pub async fn summary(&self) -> Result<TodaySummary> {
        let display = self.display().await?;
        let today = self.clock.today();
        let goal = self
            .cache
            .get_goal()
            .await
            .context("Failed to read daily goal")?;
        let flag = self
            .cache
            .get_notification_flag(&today)
            .await
            .context("Failed to read notification flag")?;

        Ok(TodaySummary {
            today,
            display,
            goal,
            notification_sent: flag.sent,
        })
    }
}
