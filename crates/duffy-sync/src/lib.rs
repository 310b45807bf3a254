//! Duffy Sync - Cross-device step synchronization
//!
//! Provides:
//! - The sync coordinator that merges inbound messages into the step cache
//! - A serialized mailbox so cache mutation and notifications never interleave
//! - A TCP link to the paired device implementing `ISyncChannel`
//! - The refresh flow feeding health provider fetches into the coordinator
//!
//! ## Modules
//!
//! - [`coordinator`] - Decision table and mailbox ([`CoordinatorHandle`])
//! - [`frame`] - Newline-delimited JSON frames carried by the link
//! - [`link`] - Paired-device TCP transport
//! - [`refresh`] - One fetch of today's steps, with cache fallback

pub mod coordinator;
pub mod frame;
pub mod link;
pub mod refresh;

pub use coordinator::{CoordinatorHandle, FetchOutcome, InboundOutcome, SyncCoordinator};
pub use frame::Frame;
pub use link::{InboundSink, LinkListener, LinkSettings, TcpSyncChannel};
pub use refresh::{refresh_today, RefreshOutcome};

use duffy_core::domain::{DayKey, DomainError};
use duffy_core::ports::HealthError;
use thiserror::Error;

/// Errors that can occur during synchronization
///
/// Every variant is recoverable: callers degrade to the cached value and
/// skip the sync step that failed.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// The health provider refused access
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The health provider or the paired device cannot be reached
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Reading or writing the step cache failed
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    /// No fresh data exists for the given day
    #[error("No fresh data for {0}")]
    StaleData(DayKey),

    /// The coordinator mailbox is no longer running
    #[error("Coordinator mailbox closed")]
    MailboxClosed,

    /// A domain-level error propagated from duffy-core
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl SyncError {
    /// Wraps a port failure as a storage failure, keeping the context chain
    pub fn storage(e: anyhow::Error) -> Self {
        SyncError::StorageFailure(format!("{e:#}"))
    }
}

impl From<HealthError> for SyncError {
    fn from(e: HealthError) -> Self {
        match e {
            HealthError::PermissionDenied(msg) => SyncError::PermissionDenied(msg),
            HealthError::NoData(day) => SyncError::StaleData(day),
            HealthError::Unavailable(msg) => SyncError::TransportUnavailable(msg),
        }
    }
}
