//! Durable title store backed by SQLite.
//!
//! Holds the last successfully extracted title per URL together with the
//! time it was written. The engine uses that time to build conditional
//! requests against the origin.
//!
//! - One row per URL, enforced by the primary key
//! - Writes are upserts (last writer wins)
//! - WAL mode for concurrent access

pub mod connection;
pub mod titles;

use async_trait::async_trait;

pub use crate::Error;
use crate::model::TitleRecord;

pub use connection::TitleDb;

/// Persistent record of last known titles, keyed by URL.
#[async_trait]
pub trait TitleStore: Send + Sync {
    /// Look up the record for `url`, if one was ever written.
    async fn find_by_url(&self, url: &str) -> Result<Option<TitleRecord>, Error>;

    /// Create or overwrite the record for `url`, stamping `last_fetched` with now.
    async fn save(&self, url: &str, title: &str) -> Result<TitleRecord, Error>;
}
