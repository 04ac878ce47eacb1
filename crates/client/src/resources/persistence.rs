//! Durable snapshot of the in-page image cache.
//!
//! A snapshot is only restored when it is younger than 24 hours and was
//! written by the same app version. Anything else (stale, foreign version,
//! undecodable) is dropped without failing startup.

use serde::{Deserialize, Serialize};
use slidecache_core::cache::IMAGE_SNAPSHOT_KEY;
use slidecache_core::{CacheDb, Error};

use super::memory_cache::{AssetRef, MemoryCache};

/// Maximum snapshot age, in milliseconds.
pub const SNAPSHOT_TTL_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedEntry {
    pub key: String,
    pub asset: AssetRef,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSnapshot {
    pub entries: Vec<PersistedEntry>,
    /// Unix milliseconds at which the snapshot was written.
    pub timestamp: i64,
    pub version: String,
}

impl PersistedSnapshot {
    /// Age as of `now_ms`; `None` when the timestamp is out of range.
    fn age_ms(&self, now_ms: i64) -> Option<i64> {
        now_ms.checked_sub(self.timestamp)
    }

    /// A snapshot from the future counts as unusable, like a stale one.
    fn is_usable(&self, now_ms: i64, version: &str) -> bool {
        self.age_ms(now_ms).is_some_and(|age| (0..SNAPSHOT_TTL_MS).contains(&age)) && self.version == version
    }
}

pub struct PersistenceBridge {
    db: CacheDb,
    version: String,
}

impl PersistenceBridge {
    pub fn new(db: CacheDb, version: impl Into<String>) -> Self {
        Self { db, version: version.into() }
    }

    /// Write the image cache, oldest entry first.
    pub async fn save(&self, cache: &MemoryCache<AssetRef>) -> Result<usize, Error> {
        let entries: Vec<PersistedEntry> = cache
            .entries()
            .into_iter()
            .map(|(key, entry)| PersistedEntry {
                key: key.to_string(),
                asset: entry.value.clone(),
                timestamp: entry.timestamp,
            })
            .collect();
        let count = entries.len();
        let snapshot = PersistedSnapshot {
            entries,
            timestamp: chrono::Utc::now().timestamp_millis(),
            version: self.version.clone(),
        };
        self.db.set_json(IMAGE_SNAPSHOT_KEY, &snapshot).await?;
        tracing::debug!(entries = count, "image cache persisted");
        Ok(count)
    }

    /// Restore usable entries as of now.
    pub async fn load(&self) -> Vec<PersistedEntry> {
        self.load_at(chrono::Utc::now().timestamp_millis()).await
    }

    /// Restore usable entries as of `now_ms`; unusable snapshots are deleted.
    pub async fn load_at(&self, now_ms: i64) -> Vec<PersistedEntry> {
        let snapshot = match self.db.get_json::<PersistedSnapshot>(IMAGE_SNAPSHOT_KEY).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::debug!(error = %err, "discarding unreadable image cache snapshot");
                self.discard().await;
                return Vec::new();
            }
        };

        if !snapshot.is_usable(now_ms, &self.version) {
            tracing::debug!(
                snapshot_version = %snapshot.version,
                age_ms = snapshot.age_ms(now_ms),
                "discarding stale image cache snapshot"
            );
            self.discard().await;
            return Vec::new();
        }

        snapshot.entries
    }

    async fn discard(&self) {
        if let Err(err) = self.db.delete_value(IMAGE_SNAPSHOT_KEY).await {
            tracing::warn!(error = %err, "failed to delete image cache snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidecache_core::ResourceKind;

    const HOUR_MS: i64 = 60 * 60 * 1000;

    fn asset(url: &str) -> AssetRef {
        AssetRef { url: url.into(), kind: ResourceKind::Image, content_type: Some("image/png".into()), size: 10 }
    }

    async fn write_snapshot(db: &CacheDb, version: &str, timestamp: i64) {
        let snapshot = PersistedSnapshot {
            entries: vec![PersistedEntry { key: "/a.png".into(), asset: asset("/a.png"), timestamp }],
            timestamp,
            version: version.into(),
        };
        db.set_json(IMAGE_SNAPSHOT_KEY, &snapshot).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let bridge = PersistenceBridge::new(db, "1.0.0");
        let mut cache = MemoryCache::new("image", 10);
        cache.insert("/a.png", asset("/a.png"));
        cache.insert("/b.png", asset("/b.png"));

        assert_eq!(bridge.save(&cache).await.unwrap(), 2);

        let keys: Vec<_> = bridge.load().await.into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["/a.png", "/b.png"]);
    }

    #[tokio::test]
    async fn test_snapshot_older_than_a_day_discarded() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = 1_700_000_000_000;
        write_snapshot(&db, "1.0.0", now - 25 * HOUR_MS).await;

        let bridge = PersistenceBridge::new(db.clone(), "1.0.0");
        assert!(bridge.load_at(now).await.is_empty());
        assert!(db.get_value(IMAGE_SNAPSHOT_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recent_snapshot_restored() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = 1_700_000_000_000;
        write_snapshot(&db, "1.0.0", now - 23 * HOUR_MS).await;

        let bridge = PersistenceBridge::new(db, "1.0.0");
        assert_eq!(bridge.load_at(now).await.len(), 1);
    }

    #[tokio::test]
    async fn test_version_mismatch_discarded() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = 1_700_000_000_000;
        write_snapshot(&db, "0.9.0", now - HOUR_MS).await;

        let bridge = PersistenceBridge::new(db, "1.0.0");
        assert!(bridge.load_at(now).await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupted_snapshot_discarded() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.set_value(IMAGE_SNAPSHOT_KEY, "{\"entries\": 3").await.unwrap();

        let bridge = PersistenceBridge::new(db.clone(), "1.0.0");
        assert!(bridge.load().await.is_empty());
        assert!(db.get_value(IMAGE_SNAPSHOT_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_future_snapshot_discarded() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let now = 1_700_000_000_000;
        write_snapshot(&db, "1.0.0", now + 1000 * 24 * HOUR_MS).await;

        let bridge = PersistenceBridge::new(db.clone(), "1.0.0");
        assert!(bridge.load_at(now).await.is_empty());
        assert!(db.get_value(IMAGE_SNAPSHOT_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_out_of_range_timestamp_discarded() {
        let db = CacheDb::open_in_memory().await.unwrap();
        write_snapshot(&db, "1.0.0", i64::MIN).await;

        let bridge = PersistenceBridge::new(db.clone(), "1.0.0");
        assert!(bridge.load_at(1_700_000_000_000).await.is_empty());
        assert!(db.get_value(IMAGE_SNAPSHOT_KEY).await.unwrap().is_none());

        write_snapshot(&db, "1.0.0", i64::MAX).await;
        assert!(bridge.load_at(-1_700_000_000_000).await.is_empty());
    }
}
