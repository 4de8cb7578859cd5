//! Persistence schema: the `graphs`, `services` and `relations` tables and
//! the connection pool they live behind.
//!
//! Services and relations are keyed by `(graph_id, id)` and cascade with
//! their graph. The schema itself is the embedded migration set under
//! `migrations/`.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::error::ServiceError;

/// Embedded migrations for the three graph tables.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a pool on `database_url` (creating the file if needed) and applies
/// pending migrations. `None` or an in-memory URL opens a private in-memory
/// database.
pub async fn open_pool(
    database_url: Option<&str>,
    max_connections: u32,
) -> Result<SqlitePool, ServiceError> {
    let pool = match file_url(database_url) {
        Some(url) => {
            let options = SqliteConnectOptions::from_str(url)?
                .create_if_missing(true)
                .foreign_keys(true)
                .journal_mode(SqliteJournalMode::Wal)
                .busy_timeout(BUSY_TIMEOUT);
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .connect_with(options)
                .await?
        }
        None => in_memory_pool().await?,
    };

    create_graph_tables(&pool).await?;
    Ok(pool)
}

/// `database_url` when it names a database file; `None` when it is absent or
/// in-memory (`sqlite::memory:`, `mode=memory`).
pub fn file_url(database_url: Option<&str>) -> Option<&str> {
    database_url.filter(|url| !(url.contains(":memory:") || url.contains("mode=memory")))
}

/// Single-connection pool over an in-memory database.
///
/// Every SQLite in-memory connection is its own database, so the pool keeps
/// exactly one connection alive for its whole lifetime.
async fn in_memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::new()
        .in_memory(true)
        .foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

/// Applies pending migrations.
pub async fn create_graph_tables(pool: &SqlitePool) -> Result<(), ServiceError> {
    MIGRATOR.run(pool).await?;
    tracing::info!(
        migrations = MIGRATOR.iter().count(),
        "Graph schema is up to date"
    );
    Ok(())
}
