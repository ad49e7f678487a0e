//! Cache generations: one response store per manifest version hash.
//!
//! A generation is materialized on first open and holds request URL ->
//! response entries. Deleting a generation drops all of its entries.

use async_trait::async_trait;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use crate::{Error, Response};

/// Handle to an opened generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    hash: String,
}

impl Generation {
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

/// Named cache-generation store.
#[async_trait]
pub trait GenerationStore: Send + Sync {
    /// Open the generation for `hash`, creating it if needed.
    async fn open_generation(&self, hash: &str) -> Result<Generation, Error>;

    /// Stored response for `url`, if any.
    async fn lookup(&self, generation: &Generation, url: &str) -> Result<Option<Response>, Error>;

    /// Store (or replace) the response for `url`.
    async fn put(&self, generation: &Generation, url: &str, response: &Response) -> Result<(), Error>;

    /// Delete a generation and its entries. Returns false if it did not exist.
    async fn delete(&self, hash: &str) -> Result<bool, Error>;

    /// Hashes of every materialized generation.
    async fn list(&self) -> Result<Vec<String>, Error>;
}

#[async_trait]
impl GenerationStore for CacheDb {
    async fn open_generation(&self, hash: &str) -> Result<Generation, Error> {
        if hash.is_empty() {
            return Err(Error::InvalidInput("generation hash cannot be empty".into()));
        }
        let key = hash.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO generations (hash, created_at) VALUES (?1, ?2)
                    ON CONFLICT(hash) DO NOTHING",
                    params![key, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        Ok(Generation { hash: hash.to_string() })
    }

    async fn lookup(&self, generation: &Generation, url: &str) -> Result<Option<Response>, Error> {
        let hash = generation.hash.clone();
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let result = conn.query_row(
                    "SELECT url, status, content_type, headers_json, body
                    FROM generation_entries WHERE hash = ?1 AND url = ?2",
                    params![hash, url],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, u16>(1)?,
                            row.get::<_, Option<String>>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, Vec<u8>>(4)?,
                        ))
                    },
                );

                match result {
                    Ok((url, status, content_type, headers_json, body)) => {
                        let headers = serde_json::from_str(&headers_json)?;
                        Ok(Some(Response { url, status, content_type, headers, body }))
                    }
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, generation: &Generation, url: &str, response: &Response) -> Result<(), Error> {
        let hash = generation.hash.clone();
        let url = url.to_string();
        let headers_json = serde_json::to_string(&response.headers)?;
        let response = response.clone();
        let stored_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                // Re-create the parent row in case a collector pass deleted it after open_generation().
                conn.execute(
                    "INSERT INTO generations (hash, created_at) VALUES (?1, ?2)
                    ON CONFLICT(hash) DO NOTHING",
                    params![hash, stored_at],
                )?;
                conn.execute(
                    "INSERT INTO generation_entries (hash, url, status, content_type, headers_json, body, stored_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    ON CONFLICT(hash, url) DO UPDATE SET
                        status = excluded.status,
                        content_type = excluded.content_type,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        hash,
                        url,
                        response.status,
                        response.content_type,
                        headers_json,
                        response.body,
                        stored_at
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, hash: &str) -> Result<bool, Error> {
        let hash = hash.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE hash = ?1", params![hash])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn list(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT hash FROM generations ORDER BY created_at ASC, hash ASC")?;
                let hashes = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(hashes)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(url: &str, body: &str) -> Response {
        Response {
            url: url.to_string(),
            status: 200,
            content_type: Some("text/html".to_string()),
            headers: vec![("cache-control".to_string(), "no-cache".to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_open_materializes() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.list().await.unwrap().is_empty());

        let generation = db.open_generation("h1").await.unwrap();
        assert_eq!(generation.hash(), "h1");
        db.open_generation("h1").await.unwrap();
        assert_eq!(db.list().await.unwrap(), vec!["h1".to_string()]);
    }

    #[tokio::test]
    async fn test_open_empty_hash_rejected() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(matches!(db.open_generation("").await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_put_and_lookup() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let generation = db.open_generation("h1").await.unwrap();
        let url = "https://app.test/app.html";

        assert!(db.lookup(&generation, url).await.unwrap().is_none());

        db.put(&generation, url, &response(url, "<html>v1</html>")).await.unwrap();
        let hit = db.lookup(&generation, url).await.unwrap().unwrap();
        assert_eq!(hit.body, b"<html>v1</html>");
        assert_eq!(hit.headers[0].0, "cache-control");
    }

    #[tokio::test]
    async fn test_generations_are_isolated() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://app.test/app.html";
        let g1 = db.open_generation("h1").await.unwrap();
        let g2 = db.open_generation("h2").await.unwrap();

        db.put(&g1, url, &response(url, "v1")).await.unwrap();
        assert!(db.lookup(&g2, url).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_cascades_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://app.test/app.html";
        let generation = db.open_generation("h1").await.unwrap();
        db.put(&generation, url, &response(url, "v1")).await.unwrap();

        assert!(db.delete("h1").await.unwrap());
        assert!(!db.delete("h1").await.unwrap());
        assert!(db.list().await.unwrap().is_empty());

        let count: i64 = db
            .conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM generation_entries", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_put_after_delete_recreates_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let url = "https://app.test/app.html";
        let generation = db.open_generation("h1").await.unwrap();
        db.delete("h1").await.unwrap();

        db.put(&generation, url, &response(url, "v1")).await.unwrap();
        assert_eq!(db.list().await.unwrap(), vec!["h1".to_string()]);
    }
}
