//! File-backed health data provider
//!
//! Reads a JSON export of daily step totals:
//!
//! ```json
//! { "2024-06-01": 8123, "2024-06-02": 10450 }
//! ```
//!
//! The file is re-read on every fetch so an external exporter can rewrite
//! it at any time.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::warn;

use duffy_core::domain::newtypes::steps_from_i64;
use duffy_core::domain::DayKey;
use duffy_core::ports::{HealthError, IHealthProvider};

/// `IHealthProvider` over a JSON file of `{ day: steps }`
pub struct FileHealthProvider {
    path: PathBuf,
}

impl FileHealthProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<DayKey, u32>, HealthError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| map_io_error(&self.path, e))?;
        parse_export(&content).map_err(|e| {
            HealthError::Unavailable(format!("{}: {}", self.path.display(), e))
        })
    }
}

fn map_io_error(path: &Path, e: std::io::Error) -> HealthError {
    match e.kind() {
        ErrorKind::PermissionDenied => HealthError::PermissionDenied(path.display().to_string()),
        ErrorKind::NotFound => HealthError::Unavailable(format!("{} not found", path.display())),
        _ => HealthError::Unavailable(format!("{}: {}", path.display(), e)),
    }
}

/// Parses the export; entries with a bad day or step count are skipped
fn parse_export(content: &str) -> Result<BTreeMap<DayKey, u32>, serde_json::Error> {
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(content)?;
    let mut days = BTreeMap::new();

    for (key, value) in raw {
        let day = match key.parse::<DayKey>() {
            Ok(day) => day,
            Err(e) => {
                warn!(key = %key, error = %e, "Skipping step entry with invalid day");
                continue;
            }
        };
        match value.as_i64().map(steps_from_i64) {
            Some(Ok(steps)) => {
                days.insert(day, steps);
            }
            _ => warn!(day = %day, value = %value, "Skipping step entry with invalid count"),
        }
    }

    Ok(days)
}

#[async_trait]
impl IHealthProvider for FileHealthProvider {
    async fn fetch_steps(&self, day: DayKey) -> Result<u32, HealthError> {
        self.load()
            .await?
            .get(&day)
            .copied()
            .ok_or(HealthError::NoData(day))
    }

    async fn fetch_range(
        &self,
        from: DayKey,
        to: DayKey,
    ) -> Result<BTreeMap<DayKey, u32>, HealthError> {
        if from > to {
            return Ok(BTreeMap::new());
        }
        let days = self.load().await?;
        Ok(days.range(from..=to).map(|(d, s)| (*d, *s)).collect())
    }
}
