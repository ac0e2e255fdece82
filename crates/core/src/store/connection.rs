//! Database connection management with pragma configuration.
//!
//! Opens the SQLite research store, applies the pragmas the engine relies
//! on (WAL for concurrent readers, foreign keys for usage provenance), and
//! brings the schema up to date.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

/// Research store handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations on a
/// background thread. Cloning is cheap; clones share the connection, so
/// single-statement updates like the reuse-counter bump stay atomic no
/// matter how many request handlers hold a handle.
#[derive(Clone, Debug)]
pub struct ResearchDb {
    pub(crate) conn: Connection,
}

impl ResearchDb {
    /// Open a store at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        configure(&conn).await?;
        Ok(Self { conn })
    }

    /// Open an in-memory store for testing.
    ///
    /// Same pragma configuration and schema as file-based stores.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        configure(&conn).await?;
        Ok(Self { conn })
    }
}

async fn configure(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| {
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;
             PRAGMA foreign_keys=ON;",
        )?;
        Ok(())
    })
    .await
    .map_err(Error::Database)?;

    migrations::run(conn).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory_creates_schema() {
        let db = ResearchDb::open_in_memory().await.unwrap();
        let tables: i64 = db
            .conn
            .call(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master
                     WHERE type='table'
                       AND name IN ('scraped_pages', 'usage_records', 'dedup_metrics')",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let db = ResearchDb::open_in_memory().await.unwrap();
        let enabled: i64 = db
            .conn
            .call(|conn| conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_clones_share_one_store() {
        let db = ResearchDb::open_in_memory().await.unwrap();
        let other = db.clone();
        db.conn
            .call(|conn| {
                conn.execute("CREATE TABLE probe (n INTEGER)", [])?;
                Ok(())
            })
            .await
            .map_err(Error::Database)
            .unwrap();
        let seen: bool = other
            .conn
            .call(|conn| {
                conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE name='probe')",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert!(seen);
    }
}
