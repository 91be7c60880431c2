//! Title record lookup and upsert.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::TitleStore;
use super::connection::TitleDb;
use crate::Error;
use crate::model::TitleRecord;

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Decode(format!("bad last_fetched {raw:?}: {e}")))
}

impl TitleDb {
    /// Number of stored records.
    pub async fn count(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM titles", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl TitleStore for TitleDb {
    async fn find_by_url(&self, url: &str) -> Result<Option<TitleRecord>, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<TitleRecord>, Error> {
                let mut stmt = conn.prepare("SELECT url, title, last_fetched FROM titles WHERE url = ?1")?;

                let result = stmt.query_row(params![url], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
                });

                match result {
                    Ok((url, title, last_fetched)) => {
                        Ok(Some(TitleRecord { url, title, last_fetched: parse_timestamp(&last_fetched)? }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Uses UPSERT semantics: inserts if the URL doesn't exist, otherwise
    /// overwrites the title and refreshes `last_fetched`.
    async fn save(&self, url: &str, title: &str) -> Result<TitleRecord, Error> {
        // HTTP dates carry whole seconds only
        let record =
            TitleRecord { url: url.to_string(), title: title.to_string(), last_fetched: Utc::now().trunc_subsecs(0) };
        let row = record.clone();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO titles (url, title, last_fetched)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(url) DO UPDATE SET
                        title = excluded.title,
                        last_fetched = excluded.last_fetched",
                    params![
                        row.url,
                        row.title,
                        row.last_fetched.to_rfc3339_opts(SecondsFormat::Secs, true)
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_find() {
        let db = TitleDb::open_in_memory().await.unwrap();

        let saved = db.save("https://example.com/", "Example Domain").await.unwrap();
        let found = db.find_by_url("https://example.com/").await.unwrap().unwrap();

        assert_eq!(found, saved);
        assert_eq!(found.title, "Example Domain");
    }

    #[tokio::test]
    async fn test_find_missing() {
        let db = TitleDb::open_in_memory().await.unwrap();
        let result = db.find_by_url("https://nowhere.example/").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites_single_record() {
        let db = TitleDb::open_in_memory().await.unwrap();

        let first = db.save("https://example.com/", "Old").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        let second = db.save("https://example.com/", "New").await.unwrap();

        assert_eq!(db.count().await.unwrap(), 1);
        let found = db.find_by_url("https://example.com/").await.unwrap().unwrap();
        assert_eq!(found.title, "New");
        assert!(second.last_fetched > first.last_fetched);
    }

    #[tokio::test]
    async fn test_urls_are_exact_keys() {
        let db = TitleDb::open_in_memory().await.unwrap();
        db.save("https://example.com/", "A").await.unwrap();
        db.save("https://example.com", "B").await.unwrap();

        assert_eq!(db.count().await.unwrap(), 2);
        assert_eq!(db.find_by_url("https://example.com").await.unwrap().unwrap().title, "B");
    }

    #[tokio::test]
    async fn test_concurrent_saves_keep_one_row() {
        let db = TitleDb::open_in_memory().await.unwrap();

        let (a, b) = tokio::join!(db.save("https://race.example/", "Same"), db.save("https://race.example/", "Same"));
        a.unwrap();
        b.unwrap();

        assert_eq!(db.count().await.unwrap(), 1);
    }
}
