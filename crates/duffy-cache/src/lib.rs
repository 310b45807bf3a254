//! Duffy Cache - Local step persistence
//!
//! SQLite-based cache for:
//! - Step counts per calendar day
//! - The shared daily goal
//! - Per-day goal notification flags
//!
//! ## Architecture
//!
//! This crate implements the `IStepsCache` port from `duffy-core` using
//! SQLite as the storage backend. It is a driven (secondary) adapter in the
//! hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteStepsCache`] - Full `IStepsCache` implementation
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use duffy_cache::{DatabasePool, SqliteStepsCache};
//! use duffy_core::ports::SystemClock;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/duffy/duffy.db")).await?;
//! let cache = SqliteStepsCache::new(pool.pool().clone(), Arc::new(SystemClock));
//! // Use cache as IStepsCache...
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod repository;

pub use pool::DatabasePool;
pub use repository::SqliteStepsCache;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be turned back into a domain type
    #[error("Corrupt value: {0}")]
    CorruptValue(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}
