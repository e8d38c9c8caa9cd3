//! Metadata database connection.
//!
//! One SQLite database per store, living next to the vector file as
//! `<path>.metadata.db`. WAL journaling keeps readers unblocked during
//! long mutation transactions.

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::time::Duration;

use crate::domain::errors::Result;

/// Connection pool manager for one store's metadata database.
///
/// # Configuration
/// - Journal mode: WAL (Write-Ahead Logging)
/// - Synchronous: NORMAL (good balance of safety and performance)
/// - Busy timeout: 5 seconds
/// - Max connections: 4 (the store is single-writer; extra connections
///   only serve concurrent readers)
#[derive(Debug, Clone)]
pub struct MetadataDb {
    pool: SqlitePool,
}

impl MetadataDb {
    /// Open (creating if missing) the database at `db_path`.
    pub async fn connect(db_path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Apply pending migrations. Safe to call on every open.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Pool handle for repository implementations.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
