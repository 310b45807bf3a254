//! Fetch today's steps and hand them to the coordinator
//!
//! The provider call runs outside the mailbox; only its result is queued.
//! A provider failure is not an error here: the cached value stays what
//! the user sees and nothing is sent to the counterpart.

use tracing::{debug, info};

use duffy_core::domain::{DayKey, StepsRecord};
use duffy_core::ports::{HealthError, IClock, IHealthProvider};

use crate::coordinator::{CoordinatorHandle, FetchOutcome};
use crate::SyncError;

/// Result of one refresh
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// Fresh data was recorded through the coordinator
    Fetched(FetchOutcome),
    /// The provider failed; the cache was left as it was
    Skipped { day: DayKey, reason: SyncError },
}

impl RefreshOutcome {
    pub fn is_fetched(&self) -> bool {
        matches!(self, RefreshOutcome::Fetched(_))
    }
}

/// Fetches today's total and records it as a local fetch
///
/// # Errors
///
/// Returns an error only when the coordinator could not record the
/// fetched value (storage failure or closed mailbox).
pub async fn refresh_today(
    provider: &dyn IHealthProvider,
    coordinator: &CoordinatorHandle,
    clock: &dyn IClock,
) -> Result<RefreshOutcome, SyncError> {
    let day = clock.today();

    let steps = match provider.fetch_steps(day).await {
        Ok(steps) => steps,
        Err(e) => {
            match &e {
                HealthError::NoData(_) => debug!(day = %day, "No step data yet"),
                _ => info!(day = %day, error = %e, "Step fetch failed, keeping cached value"),
            }
            return Ok(RefreshOutcome::Skipped {
                day,
                reason: SyncError::from(e),
            });
        }
    };

    let outcome = coordinator
        .local_fetch(StepsRecord::new(day, steps))
        .await?;
    Ok(RefreshOutcome::Fetched(outcome))
}
