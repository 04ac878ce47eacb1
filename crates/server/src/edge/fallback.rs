//! Offline fallback: any stored copy, then the offline document for
//! navigations, then a 503 JSON payload.

use slidecache_core::{ResourceRequest, ResourceResponse, StoreKind};

use super::EdgeCacheService;

impl EdgeCacheService {
    pub async fn fallback(&self, request: &ResourceRequest) -> ResourceResponse {
        match self.db().match_any(&request.cache_key()).await {
            Ok(Some((store, response))) => {
                tracing::debug!(url = %request.url, store = %store, "fallback served stored copy");
                return response;
            }
            Ok(None) => {}
            Err(err) => tracing::warn!(url = %request.url, error = %err, "fallback store scan failed"),
        }

        if request.is_navigation()
            && let Some(page) = self.offline_page().await
        {
            tracing::debug!(url = %request.url, "fallback served offline page");
            return page;
        }

        ResourceResponse::offline_error(request.url.as_str(), "The resource is unavailable while offline")
    }

    async fn offline_page(&self) -> Option<ResourceResponse> {
        let url = self.resolve(&self.inner.offline_page).ok()?;
        let store = self.store_name(StoreKind::Static).await.ok()?;
        let key = ResourceRequest::get(url).cache_key();
        match self.db().match_entry(&store, &key).await {
            Ok(page) => page,
            Err(err) => {
                tracing::warn!(store = %store, error = %err, "offline page lookup failed");
                None
            }
        }
    }
}
