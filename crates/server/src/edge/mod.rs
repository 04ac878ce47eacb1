//! Edge tier: request interception over the three store partitions.
//!
//! ### The service value
//! [`EdgeCacheService`] owns the database handle, the network fetcher, the
//! eviction bounds and the generation state. It is constructed once per
//! process and cloned cheaply into tasks (router calls, background
//! revalidation, the control channel).
//!
//! ### Generations
//! Store names carry a version tag (`{prefix}-{partition}-{version}`). A
//! freshly installed generation waits until it is adopted, unless no
//! generation was active yet. Until a generation is active every request
//! bypasses the tier.

pub mod control;
pub mod eviction;
pub mod fallback;
pub mod lifecycle;
pub mod router;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use slidecache_client::{Fetcher, canonicalize};
use slidecache_core::{AppConfig, CacheDb, Error, ResourceRequest, ResourceResponse, StoreKind};
use tokio::sync::RwLock;
use url::Url;

pub use control::ControlHandle;
pub use eviction::EvictionManager;
pub use router::RouteOutcome;

#[derive(Debug, Default, Clone)]
struct Generations {
    active: Option<String>,
    waiting: Option<String>,
}

struct EdgeInner {
    db: CacheDb,
    network: Arc<dyn Fetcher>,
    eviction: EvictionManager,
    origin: Url,
    cache_prefix: String,
    cache_version: String,
    manifest: Vec<String>,
    offline_page: String,
    generations: RwLock<Generations>,
}

/// Handle to the edge tier. Clones share state.
#[derive(Clone)]
pub struct EdgeCacheService {
    inner: Arc<EdgeInner>,
}

impl EdgeCacheService {
    pub fn new(db: CacheDb, network: Arc<dyn Fetcher>, config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {}", config.origin, e)))?;
        let inner = EdgeInner {
            db,
            network,
            eviction: EvictionManager::from_config(config),
            origin,
            cache_prefix: config.cache_prefix.clone(),
            cache_version: config.cache_version.clone(),
            manifest: config.manifest.clone(),
            offline_page: config.offline_page.clone(),
            generations: RwLock::new(Generations::default()),
        };
        Ok(Self { inner: Arc::new(inner) })
    }

    pub fn db(&self) -> &CacheDb {
        &self.inner.db
    }

    pub(crate) fn network(&self) -> &Arc<dyn Fetcher> {
        &self.inner.network
    }

    pub fn eviction(&self) -> &EvictionManager {
        &self.inner.eviction
    }

    /// Version this build wants to serve.
    pub fn target_version(&self) -> &str {
        &self.inner.cache_version
    }

    pub async fn active_version(&self) -> Option<String> {
        self.inner.generations.read().await.active.clone()
    }

    pub async fn waiting_version(&self) -> Option<String> {
        self.inner.generations.read().await.waiting.clone()
    }

    /// Store name of a partition in the given generation.
    pub fn store_name_for(&self, kind: StoreKind, version: &str) -> String {
        kind.store_name(&self.inner.cache_prefix, version)
    }

    /// Store name of a partition in the active generation.
    pub async fn store_name(&self, kind: StoreKind) -> Result<String, Error> {
        let active = self.active_version().await.ok_or(Error::NoActiveGeneration)?;
        Ok(self.store_name_for(kind, &active))
    }

    /// Resolve a manifest path or absolute URL against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url, Error> {
        Ok(canonicalize(path, &self.inner.origin)?)
    }
}

/// Page-side fetches flow through the router; bypassed requests go straight
/// to the network.
#[async_trait]
impl Fetcher for EdgeCacheService {
    async fn fetch(&self, request: &ResourceRequest) -> Result<ResourceResponse, Error> {
        match self.route(request).await {
            RouteOutcome::Bypass => self.inner.network.fetch(request).await,
            RouteOutcome::Responded { response, .. } => Ok(response),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{ORIGIN, service_with};
    use super::*;

    #[tokio::test]
    async fn test_store_name_requires_active_generation() {
        let (edge, _) = service_with(Default::default()).await;
        assert!(matches!(edge.store_name(StoreKind::Static).await, Err(Error::NoActiveGeneration)));
        assert_eq!(edge.store_name_for(StoreKind::Image, "v7"), "slidecache-image-v7");
    }

    #[tokio::test]
    async fn test_fetch_bypasses_before_activation() {
        let (edge, network) = service_with(Default::default()).await;
        network.serve(&format!("{ORIGIN}/img/a.png"), 200, "png");

        let request = ResourceRequest::get(edge.resolve("/img/a.png").unwrap());
        let response = edge.fetch(&request).await.unwrap();
        assert_eq!(response.status, 200);
        assert!(edge.db().store_names().await.unwrap().is_empty());
    }
}
