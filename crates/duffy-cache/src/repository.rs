//! SQLite implementation of IStepsCache
//!
//! ## Type Mapping
//!
//! | Domain Type      | SQL Type | Strategy                                   |
//! |------------------|----------|--------------------------------------------|
//! | DayKey           | TEXT     | `YYYY-MM-DD` via `Display` / `FromStr`     |
//! | steps (u32)      | INTEGER  | widened to i64, checked on the way back    |
//! | GoalValue        | TEXT     | decimal string in `settings`               |
//! | flag `sent`      | INTEGER  | 0 / 1                                      |
//! | DateTime<Utc>    | TEXT     | ISO 8601 via `to_rfc3339()`                |
//!
//! Because `YYYY-MM-DD` sorts lexicographically in date order, range
//! queries and pruning compare the `day` column as plain text.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use duffy_core::domain::newtypes::steps_from_i64;
use duffy_core::domain::{DayKey, GoalValue, NotificationFlag, StepsRecord};
use duffy_core::ports::{IClock, IStepsCache};

use crate::CacheError;

/// Settings key under which the shared daily goal is stored
pub const GOAL_SETTING_KEY: &str = "stepsDailyGoal";

/// SQLite-backed step cache
///
/// Staleness is judged against the injected clock, so a record written
/// yesterday becomes stale at local midnight without any write.
pub struct SqliteStepsCache {
    pool: SqlitePool,
    clock: Arc<dyn IClock>,
}

impl SqliteStepsCache {
    /// Creates a new cache instance with the given connection pool
    pub fn new(pool: SqlitePool, clock: Arc<dyn IClock>) -> Self {
        Self { pool, clock }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

fn parse_day(s: &str) -> Result<DayKey, CacheError> {
    DayKey::from_str(s)
        .map_err(|e| CacheError::CorruptValue(format!("Invalid day '{}': {}", s, e)))
}

fn row_to_record(row: &SqliteRow) -> Result<StepsRecord, CacheError> {
    let day: String = row.try_get("day")?;
    let steps: i64 = row.try_get("steps")?;
    let steps = steps_from_i64(steps)
        .map_err(|e| CacheError::CorruptValue(format!("Invalid steps for {}: {}", day, e)))?;
    Ok(StepsRecord::new(parse_day(&day)?, steps))
}

fn parse_goal(s: &str) -> Result<GoalValue, CacheError> {
    let raw: i64 = s
        .trim()
        .parse()
        .map_err(|e| CacheError::CorruptValue(format!("Invalid goal '{}': {}", s, e)))?;
    GoalValue::try_from(raw).map_err(|e| CacheError::CorruptValue(e.to_string()))
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

// ============================================================================
// IStepsCache implementation
// ============================================================================

#[async_trait::async_trait]
impl IStepsCache for SqliteStepsCache {
    async fn get(&self, day: &DayKey) -> anyhow::Result<Option<StepsRecord>> {
        let row = sqlx::query("SELECT day, steps FROM steps_days WHERE day = ?")
            .bind(day.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => Ok(Some(row_to_record(&r)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, record: &StepsRecord) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO steps_days (day, steps, updated_at) VALUES (?, ?, ?)",
        )
        .bind(record.day.to_string())
        .bind(i64::from(record.steps))
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(day = %record.day, steps = record.steps, "Cached step record");
        Ok(())
    }

    async fn get_goal(&self) -> anyhow::Result<GoalValue> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
                .bind(GOAL_SETTING_KEY)
                .fetch_optional(&self.pool)
                .await?;

        match value {
            Some(v) => Ok(parse_goal(&v)?),
            None => Ok(GoalValue::UNSET),
        }
    }

    async fn set_goal(&self, goal: GoalValue) -> anyhow::Result<()> {
        sqlx::query("INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?, ?, ?)")
            .bind(GOAL_SETTING_KEY)
            .bind(goal.steps().to_string())
            .bind(now_rfc3339())
            .execute(&self.pool)
            .await?;

        tracing::debug!(goal = %goal, "Stored daily goal");
        Ok(())
    }

    fn is_stale(&self, day: &DayKey) -> bool {
        *day != self.clock.today()
    }

    async fn get_notification_flag(&self, day: &DayKey) -> anyhow::Result<NotificationFlag> {
        let sent: Option<i64> =
            sqlx::query_scalar("SELECT sent FROM notification_flags WHERE day = ?")
                .bind(day.to_string())
                .fetch_optional(&self.pool)
                .await?;

        Ok(NotificationFlag {
            day: *day,
            sent: sent.unwrap_or(0) != 0,
        })
    }

    async fn mark_notification_sent(&self, day: &DayKey) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO notification_flags (day, sent, updated_at) VALUES (?, 1, ?)",
        )
        .bind(day.to_string())
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(day = %day, "Marked goal notification as sent");
        Ok(())
    }

    async fn try_mark_notification_sent(&self, day: &DayKey) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "INSERT INTO notification_flags (day, sent, updated_at) VALUES (?, 1, ?) \
             ON CONFLICT(day) DO UPDATE SET sent = 1, updated_at = excluded.updated_at \
             WHERE notification_flags.sent = 0",
        )
        .bind(day.to_string())
        .bind(now_rfc3339())
        .execute(&self.pool)
        .await?;

        let claimed = result.rows_affected() == 1;
        tracing::debug!(day = %day, claimed, "Claimed goal notification flag");
        Ok(claimed)
    }

    async fn range(&self, from: &DayKey, to: &DayKey) -> anyhow::Result<Vec<StepsRecord>> {
        let rows = sqlx::query(
            "SELECT day, steps FROM steps_days WHERE day >= ? AND day <= ? ORDER BY day DESC",
        )
        .bind(from.to_string())
        .bind(to.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(row_to_record(row)?);
        }
        Ok(records)
    }

    async fn prune_before(&self, day: &DayKey) -> anyhow::Result<u64> {
        let cutoff = day.to_string();
        let mut tx = self.pool.begin().await?;

        let steps = sqlx::query("DELETE FROM steps_days WHERE day < ?")
            .bind(&cutoff)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM notification_flags WHERE day < ?")
            .bind(&cutoff)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        if steps > 0 {
            tracing::info!(before = %day, removed = steps, "Pruned old step records");
        }
        Ok(steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_goal() {
        assert_eq!(parse_goal("10000").unwrap(), GoalValue::new(10_000));
        assert_eq!(parse_goal(" 0 ").unwrap(), GoalValue::UNSET);
        assert!(matches!(
            parse_goal("ten"),
            Err(CacheError::CorruptValue(_))
        ));
        assert!(parse_goal("-5").is_err());
    }

    #[test]
    fn test_parse_day() {
        assert_eq!(
            parse_day("2024-06-01").unwrap(),
            DayKey::from_ymd(2024, 6, 1).unwrap()
        );
        assert!(matches!(
            parse_day("01/06/2024"),
            Err(CacheError::CorruptValue(_))
        ));
    }
}
