//! Persistent key-value documents.
//!
//! The engine keeps two JSON documents here: page registrations with
//! manifest histories, and session pins. Values are whole documents;
//! callers that read-modify-write serialize among themselves.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use crate::Error;

/// Key holding the serialized [`Registry`](crate::manifest::Registry).
pub const REGISTRY_KEY: &str = "registry";

/// Key holding the session id -> version hash map.
pub const SESSION_PINS_KEY: &str = "session_pins";

/// Key-value store consumed by the engine.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value; `None` when the key was never written.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, Error>;

    /// Write (or replace) a value.
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), Error>;
}

/// Read a typed document, `None` when absent.
pub async fn get_typed<T: DeserializeOwned>(kv: &dyn KvStore, key: &str) -> Result<Option<T>, Error> {
    match kv.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Write a typed document.
pub async fn set_typed<T: Serialize + ?Sized>(kv: &dyn KvStore, key: &str, value: &T) -> Result<(), Error> {
    kv.set(key, serde_json::to_value(value)?).await
}

#[async_trait]
impl KvStore for CacheDb {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, Error> {
        let key = key.to_string();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let result = conn.query_row("SELECT value_json FROM kv WHERE key = ?1", params![key], |row| row.get(0));

                match result {
                    Ok(json) => Ok(Some(json)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(|json| serde_json::from_str(&json).map_err(Error::from)).transpose()
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), Error> {
        let key = key.to_string();
        let json = serde_json::to_string(&value)?;
        let updated_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO kv (key, value_json, updated_at) VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        value_json = excluded.value_json,
                        updated_at = excluded.updated_at",
                    params![key, json, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
