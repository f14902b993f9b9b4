//! SQLite pool construction.

use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

pub type DbPool = sqlx::SqlitePool;

/// Pool sizing knobs. The write side is a handful of orchestrator tasks
/// persisting one row each per run, so the defaults stay small; WAL keeps
/// concurrent readers off the writer's back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self { max_connections: 4, acquire_timeout: Duration::from_secs(15) }
    }
}

impl PoolSettings {
    /// Single-connection pool. In-memory databases need this: every handle
    /// must share the one connection that owns the data.
    pub fn single_connection() -> Self {
        Self { max_connections: 1, ..Self::default() }
    }
}

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with(database_url, PoolSettings::default()).await
}

pub async fn connect_with(
    database_url: &str,
    settings: PoolSettings,
) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(settings.max_connections.max(1))
        .acquire_timeout(settings.acquire_timeout)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                // Referential integrity is opt-in per connection in SQLite.
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                // NORMAL is durable enough under WAL.
                sqlx::query("PRAGMA synchronous = NORMAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

#[cfg(test)]
mod tests {
    use super::{connect_with, PoolSettings};

    #[tokio::test]
    async fn connections_enforce_foreign_keys() {
        let pool = connect_with("sqlite::memory:", PoolSettings::single_connection())
            .await
            .expect("connect");
        let row: (i64,) =
            sqlx::query_as("PRAGMA foreign_keys").fetch_one(&pool).await.expect("pragma");
        assert_eq!(row.0, 1);
    }
}
