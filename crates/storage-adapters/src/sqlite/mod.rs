//! # SQLite backend
//!
//! One `SqliteStore` implements every repository port over a shared
//! `SqlitePool`. UUIDs are stored as 16-byte BLOBs and timestamps as
//! RFC 3339 TEXT, both through sqlx's own encoders.

mod forums;
mod notifications;
mod posts;
mod profiles;
mod replies;
mod themes;
mod users;

use std::str::FromStr;
use std::time::Duration;

use domains::DomainError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

/// Failures while opening or migrating the database.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `url` in WAL mode with
    /// foreign keys enforced.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5))
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;
        tracing::info!(url, max_connections, "database pool created");
        Ok(Self { pool })
    }

    /// Private in-memory database. The database lives as long as its one
    /// connection, so that connection is never recycled.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }
}

/// Maps sqlx failures onto the domain: unique violations become conflicts,
/// everything else is internal.
pub(crate) fn db_err(err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return DomainError::Conflict(format!("duplicate value: {}", db.message()));
        }
    }
    tracing::error!(error = %err, "database error");
    DomainError::Internal(err.to_string())
}

/// Wraps a domain parse failure so it can surface from a row mapper.
pub(crate) fn decode_err(err: DomainError) -> sqlx::Error {
    sqlx::Error::Decode(Box::new(err))
}

/// `LIKE` pattern matching `needle` literally anywhere, for use with `ESCAPE '\'`.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(contains_pattern("Rust"), "%rust%");
        assert_eq!(contains_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }

    #[tokio::test]
    async fn migrations_apply_to_a_fresh_database() {
        let store = SqliteStore::in_memory().await.unwrap();
        // Re-running is a no-op.
        store.migrate().await.unwrap();
        let themes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM themes")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(themes, 0);
    }
}
