use std::path::{Path, PathBuf};
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

use crate::migrations;

pub type DbPool = sqlx::SqlitePool;

const INDEX_MAX_CONNECTIONS: u32 = 5;
const INDEX_ACQUIRE_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    /// The index file must already exist. Used when serving requests.
    Existing,
    /// Create the index file if needed. Used by ingestion.
    CreateIfMissing,
}

#[derive(Debug, Error)]
pub enum IndexOpenError {
    #[error("index file `{0}` does not exist; run `productai ingest` first")]
    Missing(PathBuf),
    #[error("could not open index `{path}`: {source}")]
    Connect { path: PathBuf, source: sqlx::Error },
    #[error("index schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

#[cfg(test)]
pub(crate) async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(database_url)
        .await
}

/// Opens the on-disk vector index and brings its schema up to date.
pub async fn open_index(path: &Path, mode: OpenMode) -> Result<DbPool, IndexOpenError> {
    if mode == OpenMode::Existing && !path.is_file() {
        return Err(IndexOpenError::Missing(path.to_path_buf()));
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(mode == OpenMode::CreateIfMissing)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(INDEX_MAX_CONNECTIONS)
        .acquire_timeout(Duration::from_secs(INDEX_ACQUIRE_TIMEOUT_SECS))
        .connect_with(options)
        .await
        .map_err(|source| IndexOpenError::Connect { path: path.to_path_buf(), source })?;

    migrations::run_pending(&pool).await?;
    Ok(pool)
}
