//! SQLite pool for the step cache
//!
//! One SQLite file per device holds the step cache. `duffyd` writes to it
//! while `duffy status` reads, so the file runs in WAL mode.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::CacheError;

/// Daemon and CLI may both hold the file open
const FILE_MAX_CONNECTIONS: u32 = 4;
/// How long a writer waits on a lock held by the other process
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = include_str!("migrations/20240601_initial.sql");

/// Shared handle to the step cache database
///
/// Cloning is cheap; all clones share the same connections.
#[derive(Clone)]
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens (creating if needed) the database file at `db_path`
    ///
    /// Parent directories are created, the journal is switched to WAL and
    /// the schema is applied.
    ///
    /// # Errors
    ///
    /// `CacheError::ConnectionFailed` when the file cannot be opened,
    /// `CacheError::MigrationFailed` when the schema cannot be applied.
    pub async fn new(db_path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::ConnectionFailed(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(FILE_MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!("{}: {}", db_path.display(), e))
            })?;

        apply_schema(&pool).await?;
        info!(path = %db_path.display(), "Step cache opened");

        Ok(Self { pool })
    }

    /// Private in-memory database, used by tests
    ///
    /// Limited to one connection: every SQLite connection to `:memory:`
    /// gets its own empty database.
    pub async fn in_memory() -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| CacheError::ConnectionFailed(format!("in-memory database: {}", e)))?;

        apply_schema(&pool).await?;
        debug!("In-memory step cache opened");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Waits for in-flight queries, then closes every connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// The schema only uses `CREATE ... IF NOT EXISTS`, so reapplying is a no-op
async fn apply_schema(pool: &SqlitePool) -> Result<(), CacheError> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| CacheError::MigrationFailed(e.to_string()))?;
    debug!("Step cache schema applied");
    Ok(())
}
