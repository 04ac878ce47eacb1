//! Strategy executors: cache-first, network-first, stale-while-revalidate.
//!
//! Only successful responses are written, and only into a store of the
//! active generation. A failed write is logged and the response is still
//! returned to the caller.

use slidecache_core::cache::is_generation;
use slidecache_core::{Error, ResourceRequest, ResourceResponse, StoreKind, Strategy};

use super::EdgeCacheService;
use super::router::ResponseSource;

/// The store partition a request resolves against.
#[derive(Debug, Clone)]
pub struct Target {
    pub store: String,
    pub kind: StoreKind,
}

pub type Resolution = (ResourceResponse, ResponseSource);

pub async fn execute(
    edge: &EdgeCacheService, strategy: Strategy, request: &ResourceRequest, target: &Target,
) -> Result<Resolution, Error> {
    match strategy {
        Strategy::CacheFirst => cache_first(edge, request, target).await,
        Strategy::NetworkFirst => network_first(edge, request, target).await,
        Strategy::StaleWhileRevalidate => stale_while_revalidate(edge, request, target).await,
    }
}

pub async fn cache_first(
    edge: &EdgeCacheService, request: &ResourceRequest, target: &Target,
) -> Result<Resolution, Error> {
    let key = request.cache_key();
    if let Some(hit) = lookup(edge, &target.store, &key).await {
        return Ok((hit, ResponseSource::Cache));
    }

    let response = edge.network().fetch(request).await?;
    store_response(edge, target, &key, request, &response, StoreMode::Open).await;
    Ok((response, ResponseSource::Network))
}

pub async fn network_first(
    edge: &EdgeCacheService, request: &ResourceRequest, target: &Target,
) -> Result<Resolution, Error> {
    let key = request.cache_key();
    match edge.network().fetch(request).await {
        Ok(response) => {
            store_response(edge, target, &key, request, &response, StoreMode::Open).await;
            Ok((response, ResponseSource::Network))
        }
        Err(err) => match lookup(edge, &target.store, &key).await {
            Some(hit) => {
                tracing::debug!(url = %request.url, error = %err, "network failed, serving cached copy");
                Ok((hit, ResponseSource::Cache))
            }
            None => Err(err),
        },
    }
}

/// Serve the cached copy immediately and refresh it in the background.
///
/// Without a cached copy the caller waits for the network.
pub async fn stale_while_revalidate(
    edge: &EdgeCacheService, request: &ResourceRequest, target: &Target,
) -> Result<Resolution, Error> {
    let key = request.cache_key();
    if let Some(hit) = lookup(edge, &target.store, &key).await {
        let edge = edge.clone();
        let request = request.clone();
        let target = target.clone();
        tokio::spawn(async move {
            match edge.network().fetch(&request).await {
                Ok(response) => {
                    store_response(&edge, &target, &key, &request, &response, StoreMode::Existing).await
                }
                Err(err) => tracing::warn!(url = %request.url, error = %err, "background revalidation failed"),
            }
        });
        return Ok((hit, ResponseSource::Cache));
    }

    let response = edge.network().fetch(request).await?;
    store_response(edge, target, &key, request, &response, StoreMode::Open).await;
    Ok((response, ResponseSource::Network))
}

async fn lookup(edge: &EdgeCacheService, store: &str, key: &str) -> Option<ResourceResponse> {
    match edge.db().match_entry(store, key).await {
        Ok(hit) => hit,
        Err(err) => {
            tracing::warn!(store, error = %err, "store read failed, treating as miss");
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreMode {
    /// Create the store if it is not open yet.
    Open,
    /// Only write into a store that still exists.
    Existing,
}

/// Write a successful response and enforce the partition bound.
///
/// The generation read lock is held for the whole write, so activation
/// cannot delete the store between the check and the insert.
async fn store_response(
    edge: &EdgeCacheService, target: &Target, key: &str, request: &ResourceRequest, response: &ResourceResponse,
    mode: StoreMode,
) {
    if !response.is_success() {
        tracing::debug!(url = %request.url, status = response.status, "not caching error response");
        return;
    }

    let generations = edge.inner.generations.read().await;
    let current = generations.active.as_deref().is_some_and(|active| is_generation(&target.store, active));
    if !current {
        tracing::debug!(store = %target.store, url = %request.url, "store is not in the active generation");
        return;
    }

    let written = async {
        if mode == StoreMode::Open {
            edge.db().open_store(&target.store).await?;
        }
        edge.db().put_entry(&target.store, key, &request.method, response).await
    }
    .await;
    match written {
        Ok(()) => {}
        Err(Error::StoreMissing(_)) => {
            tracing::debug!(store = %target.store, url = %request.url, "store was cleared, dropping write");
            return;
        }
        Err(err) => {
            tracing::warn!(store = %target.store, url = %request.url, error = %err, "store write failed");
            return;
        }
    }
    if let Err(err) = edge.eviction().enforce(edge.db(), &target.store, target.kind).await {
        tracing::warn!(store = %target.store, error = %err, "eviction failed");
    }
    drop(generations);
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ORIGIN, active_service};
    use super::*;
    use slidecache_core::AppConfig;
    use std::time::Duration;

    async fn target(edge: &EdgeCacheService, kind: StoreKind) -> Target {
        Target { store: edge.store_name(kind).await.unwrap(), kind }
    }

    fn request(edge: &EdgeCacheService, path: &str) -> ResourceRequest {
        ResourceRequest::get(edge.resolve(path).unwrap())
    }

    #[tokio::test]
    async fn test_cache_first_hit_skips_network() {
        let (edge, network) = active_service(AppConfig::default()).await;
        network.serve(&format!("{ORIGIN}/css/deck.css"), 200, "body{}");
        let req = request(&edge, "/css/deck.css");
        let target = target(&edge, StoreKind::Static).await;
        let calls = network.calls();

        let (_, source) = cache_first(&edge, &req, &target).await.unwrap();
        assert_eq!(source, ResponseSource::Network);

        let (response, source) = cache_first(&edge, &req, &target).await.unwrap();
        assert_eq!(source, ResponseSource::Cache);
        assert_eq!(&response.body[..], b"body{}");
        assert_eq!(network.calls(), calls + 1);
    }

    #[tokio::test]
    async fn test_cache_first_miss_and_offline_is_error() {
        let (edge, _) = active_service(AppConfig::default()).await;
        let target = target(&edge, StoreKind::Image).await;
        let err = cache_first(&edge, &request(&edge, "/img/x.png"), &target).await.unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_error_status_not_cached() {
        let (edge, network) = active_service(AppConfig::default()).await;
        network.serve(&format!("{ORIGIN}/img/gone.png"), 404, "missing");
        let req = request(&edge, "/img/gone.png");
        let target = target(&edge, StoreKind::Image).await;

        let (response, _) = cache_first(&edge, &req, &target).await.unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(edge.db().count_entries(&target.store).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fifo_eviction_after_writes() {
        let config = AppConfig { image_max_entries: 3, ..Default::default() };
        let (edge, network) = active_service(config).await;
        let target = target(&edge, StoreKind::Image).await;

        for name in ["a", "b", "c", "d"] {
            network.serve(&format!("{ORIGIN}/img/{name}.png"), 200, name);
            cache_first(&edge, &request(&edge, &format!("/img/{name}.png")), &target).await.unwrap();
            assert!(edge.db().count_entries(&target.store).await.unwrap() <= 3);
        }

        let urls = edge.db().entry_urls(&target.store).await.unwrap();
        let expected: Vec<String> = ["b", "c", "d"].iter().map(|n| format!("{ORIGIN}/img/{n}.png")).collect();
        assert_eq!(urls, expected);
    }

    #[tokio::test]
    async fn test_network_first_prefers_network() {
        let (edge, network) = active_service(AppConfig::default()).await;
        let url = format!("{ORIGIN}/api/slides");
        let req = request(&edge, "/api/slides");
        let target = target(&edge, StoreKind::Dynamic).await;

        network.serve(&url, 200, "v1");
        network_first(&edge, &req, &target).await.unwrap();
        network.serve(&url, 200, "v2");
        let (response, source) = network_first(&edge, &req, &target).await.unwrap();
        assert_eq!(source, ResponseSource::Network);
        assert_eq!(&response.body[..], b"v2");
    }

    #[tokio::test]
    async fn test_network_first_falls_back_to_cache() {
        let (edge, network) = active_service(AppConfig::default()).await;
        let url = format!("{ORIGIN}/api/slides");
        let req = request(&edge, "/api/slides");
        let target = target(&edge, StoreKind::Dynamic).await;

        network.serve(&url, 200, "v1");
        network_first(&edge, &req, &target).await.unwrap();
        network.fail(&url);

        let (response, source) = network_first(&edge, &req, &target).await.unwrap();
        assert_eq!(source, ResponseSource::Cache);
        assert_eq!(&response.body[..], b"v1");

        let other = request(&edge, "/api/other");
        assert!(network_first(&edge, &other, &target).await.is_err());
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_serves_stale_then_updates() {
        let (edge, network) = active_service(AppConfig::default()).await;
        let url = format!("{ORIGIN}/notes");
        let req = request(&edge, "/notes");
        let target = target(&edge, StoreKind::Dynamic).await;

        network.serve(&url, 200, "old");
        let (_, source) = stale_while_revalidate(&edge, &req, &target).await.unwrap();
        assert_eq!(source, ResponseSource::Network);

        network.serve(&url, 200, "new");
        network.set_delay(Duration::from_millis(200));

        let started = std::time::Instant::now();
        let (response, source) = stale_while_revalidate(&edge, &req, &target).await.unwrap();
        assert!(started.elapsed() < Duration::from_millis(200));
        assert_eq!(source, ResponseSource::Cache);
        assert_eq!(&response.body[..], b"old");

        let key = req.cache_key();
        let refreshed = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Some(entry) = edge.db().match_entry(&target.store, &key).await.unwrap()
                    && &entry.body[..] == b"new"
                {
                    return entry;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;
        assert!(refreshed.is_ok());
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_background_failure_keeps_entry() {
        let (edge, network) = active_service(AppConfig::default()).await;
        let url = format!("{ORIGIN}/notes");
        let req = request(&edge, "/notes");
        let target = target(&edge, StoreKind::Dynamic).await;

        network.serve(&url, 200, "old");
        stale_while_revalidate(&edge, &req, &target).await.unwrap();
        network.fail(&url);

        let (response, _) = stale_while_revalidate(&edge, &req, &target).await.unwrap();
        assert_eq!(&response.body[..], b"old");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(edge.db().count_entries(&target.store).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_write_skipped_outside_active_generation() {
        let (edge, network) = active_service(AppConfig::default()).await;
        network.serve(&format!("{ORIGIN}/img/a.png"), 200, "png");
        let stale = Target { store: edge.store_name_for(StoreKind::Image, "v0"), kind: StoreKind::Image };

        let (_, source) = cache_first(&edge, &request(&edge, "/img/a.png"), &stale).await.unwrap();
        assert_eq!(source, ResponseSource::Network);
        assert!(!edge.db().has_store(&stale.store).await.unwrap());
    }

    #[tokio::test]
    async fn test_revalidation_across_activation_keeps_old_store_deleted() {
        let (edge, network) = active_service(AppConfig::default()).await;
        let url = format!("{ORIGIN}/notes");
        let req = request(&edge, "/notes");
        let target = target(&edge, StoreKind::Dynamic).await;

        network.serve(&url, 200, "old");
        stale_while_revalidate(&edge, &req, &target).await.unwrap();
        edge.install("v2").await.unwrap();

        network.serve(&url, 200, "new");
        network.set_delay(Duration::from_millis(100));
        let (_, source) = stale_while_revalidate(&edge, &req, &target).await.unwrap();
        assert_eq!(source, ResponseSource::Cache);

        let deleted = edge.activate().await.unwrap();
        assert!(deleted.contains(&target.store));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(edge.db().store_names().await.unwrap(), vec!["slidecache-static-v2".to_string()]);
        assert!(edge.db().match_any(&req.cache_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revalidation_after_clear_does_not_recreate_store() {
        let (edge, network) = active_service(AppConfig::default()).await;
        let url = format!("{ORIGIN}/notes");
        let req = request(&edge, "/notes");
        let target = target(&edge, StoreKind::Dynamic).await;

        network.serve(&url, 200, "old");
        stale_while_revalidate(&edge, &req, &target).await.unwrap();

        network.serve(&url, 200, "new");
        network.set_delay(Duration::from_millis(100));
        stale_while_revalidate(&edge, &req, &target).await.unwrap();
        edge.db().delete_all_stores().await.unwrap();

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(edge.db().store_names().await.unwrap().is_empty());
    }
}
