//! Named store partitions and their entries.
//!
//! A store is a named bucket of cached responses. Entries carry a
//! monotonically increasing `seq` that records insertion order; eviction
//! reads that index instead of trusting table enumeration order. Writing a
//! key that already exists reinserts it at the back, reading never moves it.

use super::connection::CacheDb;
use crate::Error;
use crate::resource::ResourceResponse;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

/// The three edge partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Static,
    Dynamic,
    Image,
}

impl StoreKind {
    pub const ALL: [StoreKind; 3] = [StoreKind::Static, StoreKind::Dynamic, StoreKind::Image];

    pub fn as_str(self) -> &'static str {
        match self {
            StoreKind::Static => "static",
            StoreKind::Dynamic => "dynamic",
            StoreKind::Image => "image",
        }
    }

    /// Store name for this partition in the given generation,
    /// e.g. `slidecache-static-v3`.
    pub fn store_name(self, prefix: &str, version: &str) -> String {
        format!("{prefix}-{}-{version}", self.as_str())
    }
}

/// Whether a store name carries the given generation tag.
pub fn is_generation(store_name: &str, version: &str) -> bool {
    store_name
        .rsplit_once('-')
        .is_some_and(|(_, tag)| tag == version)
}

fn decode_response(url: String, status: i64, headers_json: &str, body: Vec<u8>) -> ResourceResponse {
    let headers: Vec<(String, String)> = serde_json::from_str(headers_json).unwrap_or_default();
    ResourceResponse::new(url, status as u16, headers, body)
}

impl CacheDb {
    /// Create a store if it does not exist yet.
    pub async fn open_store(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM stores WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// All store names, newest-created first.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY id DESC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Every store with its entry count, newest-created first.
    ///
    /// Empty stores are included with a count of zero.
    pub async fn store_counts(&self) -> Result<Vec<(String, u64)>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<(String, u64)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT s.name, COUNT(e.seq) FROM stores s
                     LEFT JOIN entries e ON e.store = s.name
                     GROUP BY s.id ORDER BY s.id DESC",
                )?;
                let counts = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(counts)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and, by cascade, all of its entries.
    ///
    /// Returns whether the store existed.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every store regardless of generation.
    ///
    /// Returns the number of stores removed.
    pub async fn delete_all_stores(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let deleted = conn.execute("DELETE FROM stores", [])?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Write a response under `key` into an open store.
    ///
    /// Fails with [`Error::StoreMissing`] when the store does not exist, so a
    /// late write cannot bring back a deleted store. An existing entry for the
    /// same key is replaced and moves to the back of the insertion order.
    pub async fn put_entry(
        &self, store: &str, key: &str, method: &str, response: &ResourceResponse,
    ) -> Result<(), Error> {
        let store = store.to_string();
        let key = key.to_string();
        let method = method.to_string();
        let response = response.clone();
        let headers_json = serde_json::to_string(&response.headers)?;
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                let exists: bool =
                    tx.query_row("SELECT EXISTS(SELECT 1 FROM stores WHERE name = ?1)", params![store], |row| {
                        row.get(0)
                    })?;
                if !exists {
                    return Err(Error::StoreMissing(store));
                }
                tx.execute("DELETE FROM entries WHERE store = ?1 AND key = ?2", params![store, key])?;
                tx.execute(
                    "INSERT INTO entries (store, key, url, method, status, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        store,
                        key,
                        response.url,
                        method,
                        response.status as i64,
                        headers_json,
                        response.body.as_ref(),
                        stored_at,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up `key` in one store.
    pub async fn match_entry(&self, store: &str, key: &str) -> Result<Option<ResourceResponse>, Error> {
        let store = store.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<ResourceResponse>, Error> {
                let row = conn
                    .query_row(
                        "SELECT url, status, headers_json, body FROM entries WHERE store = ?1 AND key = ?2",
                        params![store, key],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, i64>(1)?,
                                row.get::<_, String>(2)?,
                                row.get::<_, Vec<u8>>(3)?,
                            ))
                        },
                    )
                    .optional()?;
                Ok(row.map(|(url, status, headers, body)| decode_response(url, status, &headers, body)))
            })
            .await
            .map_err(Error::from)
    }

    /// Look up `key` across every store, newest-created store first.
    ///
    /// Returns the name of the store that answered along with the response.
    pub async fn match_any(&self, key: &str) -> Result<Option<(String, ResourceResponse)>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<(String, ResourceResponse)>, Error> {
                let row = conn
                    .query_row(
                        "SELECT e.store, e.url, e.status, e.headers_json, e.body
                         FROM entries e JOIN stores s ON s.name = e.store
                         WHERE e.key = ?1
                         ORDER BY s.id DESC LIMIT 1",
                        params![key],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, i64>(2)?,
                                row.get::<_, String>(3)?,
                                row.get::<_, Vec<u8>>(4)?,
                            ))
                        },
                    )
                    .optional()?;
                Ok(row.map(|(store, url, status, headers, body)| (store, decode_response(url, status, &headers, body))))
            })
            .await
            .map_err(Error::from)
    }

    pub async fn count_entries(&self, store: &str) -> Result<u64, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// URLs of a store's entries, oldest first.
    pub async fn entry_urls(&self, store: &str) -> Result<Vec<String>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE store = ?1 ORDER BY seq ASC")?;
                let urls = stmt
                    .query_map(params![store], |row| row.get(0))?
                    .collect::<Result<Vec<String>, rusqlite::Error>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove the oldest entries of a store until at most `max_entries` remain.
    ///
    /// Returns the number of deleted entries.
    pub async fn evict_oldest(&self, store: &str, max_entries: usize) -> Result<u64, Error> {
        let store = store.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| row.get(0))?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE seq IN (
                    SELECT seq FROM entries WHERE store = ?1 ORDER BY seq ASC LIMIT ?2
                )",
                    params![store, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
