//! Request router: classify, pick the bound strategy, resolve against the
//! partition for that classification, and fall back when resolution fails.

use serde::Serialize;
use slidecache_core::{ResourceRequest, ResourceResponse, classify};

use super::EdgeCacheService;
use super::strategy::{self, Target};

/// Where a routed response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    Fallback,
}

impl ResponseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::Fallback => "fallback",
        }
    }
}

#[derive(Debug)]
pub enum RouteOutcome {
    /// The request is not intercepted and goes to the network untouched.
    Bypass,
    Responded { response: ResourceResponse, source: ResponseSource },
}

impl EdgeCacheService {
    /// Route one intercepted request.
    ///
    /// Non-GET requests, non-HTTP(S) schemes and requests arriving before any
    /// generation is active are bypassed.
    pub async fn route(&self, request: &ResourceRequest) -> RouteOutcome {
        if !request.is_interceptable() {
            return RouteOutcome::Bypass;
        }
        let Some(version) = self.active_version().await else {
            return RouteOutcome::Bypass;
        };

        let kind = classify(&request.url);
        let strategy = kind.strategy();
        let store_kind = kind.store();
        let target = Target { store: self.store_name_for(store_kind, &version), kind: store_kind };

        match strategy::execute(self, strategy, request, &target).await {
            Ok((response, source)) => {
                tracing::debug!(
                    url = %request.url,
                    kind = ?kind,
                    strategy = %strategy,
                    store = %target.store,
                    source = ?source,
                    status = response.status,
                    "routed"
                );
                RouteOutcome::Responded { response, source }
            }
            Err(err) => {
                tracing::debug!(
                    url = %request.url,
                    strategy = %strategy,
                    error = %err,
                    "strategy failed, using fallback"
                );
                let response = self.fallback(request).await;
                RouteOutcome::Responded { response, source: ResponseSource::Fallback }
            }
        }
    }
}
