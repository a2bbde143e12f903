//! Connection pool for the chessroom database.
//!
//! Rooms write on every committed move. The file is opened in WAL mode with
//! `synchronous = NORMAL`, and the schema (`games`, `auth_tokens`) embedded
//! from `migrations/` is brought up to date on every open.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use crate::persistence::PersistenceError;

const POOL_SIZE: u32 = 5;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the database file at `path`, creating it and its parent
    /// directories on first run.
    pub async fn open(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
        let db = Self::connect(options, POOL_SIZE).await?;
        tracing::debug!(path = %path.display(), "Database ready");
        Ok(db)
    }

    #[cfg(test)]
    pub async fn new_in_memory() -> Result<Self, PersistenceError> {
        // Every connection to `:memory:` is its own database, so pin the pool to one.
        Self::connect(SqliteConnectOptions::from_str("sqlite::memory:")?, 1).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn connect(options: SqliteConnectOptions, max: u32) -> Result<Self, PersistenceError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| PersistenceError::Migration(e.to_string()))?;
        Ok(Self { pool })
    }
}
