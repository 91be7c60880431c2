//! Opening the title database.
//!
//! The schema is tracked with SQLite's `user_version`: a fresh file gets
//! the `titles` table and is stamped with [`SCHEMA_VERSION`]; a file
//! written by a newer build is refused rather than guessed at.

use std::path::Path;

use tokio_rusqlite::Connection;
use tokio_rusqlite::rusqlite;

use crate::Error;

/// Schema revision this build reads and writes.
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = include_str!("../../sql/titles.sql");

// WAL lets lookups read while a save is in flight.
const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA busy_timeout=5000;";

/// Title store handle.
///
/// Cloning is cheap; clones share one background connection thread.
#[derive(Clone, Debug)]
pub struct TitleDb {
    pub(crate) conn: Connection,
}

impl TitleDb {
    /// Open (or create) the title database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        tracing::info!(path = %path.display(), "opening title store");
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    /// A private, empty title store that lives as long as the handle.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| -> Result<(), Error> {
            conn.execute_batch(PRAGMAS)?;
            ensure_schema(conn)
        })
        .await?;

        Ok(Self { conn })
    }

    /// Schema revision recorded in the database file.
    pub async fn schema_version(&self) -> Result<i64, Error> {
        self.conn
            .call(|conn| -> Result<i64, Error> { Ok(read_version(conn)?) })
            .await
            .map_err(Error::from)
    }
}

fn read_version(conn: &rusqlite::Connection) -> rusqlite::Result<i64> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

fn ensure_schema(conn: &rusqlite::Connection) -> Result<(), Error> {
    match read_version(conn)? {
        SCHEMA_VERSION => Ok(()),
        0 => {
            tracing::debug!(version = SCHEMA_VERSION, "creating titles schema");
            let tx = conn.unchecked_transaction()?;
            tx.execute_batch(SCHEMA)?;
            tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            tx.commit()?;
            Ok(())
        }
        found => Err(Error::MigrationFailed(format!(
            "database schema version {found} is not supported (expected {SCHEMA_VERSION})"
        ))),
    }
}
