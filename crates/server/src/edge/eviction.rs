//! Per-partition entry bounds.
//!
//! Eviction is FIFO over the explicit insertion index kept by the store:
//! reads never move an entry, overwrites move it to the back.

use slidecache_core::{AppConfig, CacheDb, Error, StoreKind};

#[derive(Debug, Clone, Copy)]
pub struct EvictionManager {
    static_max: usize,
    dynamic_max: usize,
    image_max: usize,
}

impl EvictionManager {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            static_max: config.max_entries(StoreKind::Static),
            dynamic_max: config.max_entries(StoreKind::Dynamic),
            image_max: config.max_entries(StoreKind::Image),
        }
    }

    pub fn max_entries(&self, kind: StoreKind) -> usize {
        match kind {
            StoreKind::Static => self.static_max,
            StoreKind::Dynamic => self.dynamic_max,
            StoreKind::Image => self.image_max,
        }
    }

    /// Bring `store` back under its bound. Returns the number of evicted entries.
    pub async fn enforce(&self, db: &CacheDb, store: &str, kind: StoreKind) -> Result<u64, Error> {
        let max = self.max_entries(kind);
        let evicted = db.evict_oldest(store, max).await?;
        if evicted > 0 {
            tracing::debug!(store, evicted, max, "evicted oldest entries");
        }
        Ok(evicted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slidecache_core::ResourceResponse;

    #[test]
    fn test_bounds_from_config() {
        let eviction = EvictionManager::from_config(&AppConfig::default());
        assert_eq!(eviction.max_entries(StoreKind::Static), 50);
        assert_eq!(eviction.max_entries(StoreKind::Dynamic), 100);
        assert_eq!(eviction.max_entries(StoreKind::Image), 200);
    }

    #[tokio::test]
    async fn test_enforce_keeps_newest() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let config = AppConfig { image_max_entries: 2, ..Default::default() };
        let eviction = EvictionManager::from_config(&config);

        db.open_store("img").await.unwrap();
        for key in ["a", "b", "c"] {
            let response = ResourceResponse::new(format!("http://deck.test/{key}.png"), 200, vec![], "x");
            db.put_entry("img", key, "GET", &response).await.unwrap();
        }

        assert_eq!(eviction.enforce(&db, "img", StoreKind::Image).await.unwrap(), 1);
        assert_eq!(
            db.entry_urls("img").await.unwrap(),
            vec!["http://deck.test/b.png", "http://deck.test/c.png"]
        );
        assert_eq!(eviction.enforce(&db, "img", StoreKind::Image).await.unwrap(), 0);
    }
}
