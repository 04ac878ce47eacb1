//! Durable namespaced key/value storage.
//!
//! Holds small documents that must survive restarts: the adopted generation
//! tag and the in-page image cache snapshot.

use super::connection::CacheDb;
use crate::Error;
use serde::{Serialize, de::DeserializeOwned};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

/// Key holding the currently adopted generation tag.
pub const GENERATION_KEY: &str = "slidecache:generation";

/// Key holding the in-page image cache snapshot.
pub const IMAGE_SNAPSHOT_KEY: &str = "slidecache:image-cache";

impl CacheDb {
    pub async fn get_value(&self, key: &str) -> Result<Option<String>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let value = conn
                    .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
                    .optional()?;
                Ok(value)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace a value.
    pub async fn set_value(&self, key: &str, value: &str) -> Result<(), Error> {
        let key = key.to_string();
        let value = value.to_string();
        let updated_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at",
                    params![key, value, updated_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    pub async fn delete_value(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Read and decode a JSON document.
    ///
    /// Decoding failures surface as `Error::SnapshotInvalid`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        match self.get_value(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), Error> {
        let raw = serde_json::to_string(value)?;
        self.set_value(key, &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.get_value(GENERATION_KEY).await.unwrap().is_none());

        db.set_value(GENERATION_KEY, "v1").await.unwrap();
        db.set_value(GENERATION_KEY, "v2").await.unwrap();
        assert_eq!(db.get_value(GENERATION_KEY).await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_delete_value() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.set_value("k", "v").await.unwrap();
        assert!(db.delete_value("k").await.unwrap());
        assert!(!db.delete_value("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_json_roundtrip_and_corruption() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.set_json("doc", &vec![1u32, 2, 3]).await.unwrap();
        let doc: Option<Vec<u32>> = db.get_json("doc").await.unwrap();
        assert_eq!(doc, Some(vec![1, 2, 3]));

        db.set_value("doc", "{not json").await.unwrap();
        let broken: Result<Option<Vec<u32>>, Error> = db.get_json("doc").await;
        assert!(matches!(broken, Err(Error::SnapshotInvalid(_))));
    }
}
