//! Health data provider port (driven/secondary port)
//!
//! The provider is an opaque external source of step counts. A failed
//! fetch is never fatal: callers fall back to the cached value.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::domain::DayKey;

/// Reasons a step fetch can fail
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HealthError {
    /// The user has not granted access to step data
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The provider has no data for the requested day
    #[error("No step data for {0}")]
    NoData(DayKey),

    /// The provider could not be reached or read
    #[error("Health provider unavailable: {0}")]
    Unavailable(String),
}

/// Port trait for reading step counts
#[async_trait::async_trait]
pub trait IHealthProvider: Send + Sync {
    /// Total steps recorded for `day`
    async fn fetch_steps(&self, day: DayKey) -> Result<u32, HealthError>;

    /// Steps per day for every day in `from..=to` that has data
    async fn fetch_range(
        &self,
        from: DayKey,
        to: DayKey,
    ) -> Result<BTreeMap<DayKey, u32>, HealthError>;
}
