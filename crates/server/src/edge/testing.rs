//! Scripted network double for edge tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use slidecache_client::Fetcher;
use slidecache_core::{AppConfig, CacheDb, Error, ResourceRequest, ResourceResponse};

use super::EdgeCacheService;

pub const ORIGIN: &str = "http://localhost:8080";

#[derive(Default)]
pub struct ScriptedNetwork {
    routes: Mutex<HashMap<String, ResourceResponse>>,
    calls: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedNetwork {
    pub fn serve(&self, url: &str, status: u16, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), ResourceResponse::new(url, status, vec![], body.to_string()));
    }

    /// Make a URL unreachable.
    pub fn fail(&self, url: &str) {
        self.routes.lock().unwrap().remove(url);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedNetwork {
    async fn fetch(&self, request: &ResourceRequest) -> Result<ResourceResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.routes
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .ok_or_else(|| Error::Network(format!("unreachable: {}", request.url)))
    }
}

/// A service over an in-memory database with no generation installed.
pub async fn service_with(config: AppConfig) -> (EdgeCacheService, Arc<ScriptedNetwork>) {
    let db = CacheDb::open_in_memory().await.unwrap();
    let network = Arc::new(ScriptedNetwork::default());
    let edge = EdgeCacheService::new(db, network.clone(), &config).unwrap();
    (edge, network)
}

pub fn serve_manifest(network: &ScriptedNetwork, config: &AppConfig) {
    for path in &config.manifest {
        network.serve(&format!("{ORIGIN}{path}"), 200, &format!("asset {path}"));
    }
}

/// A service whose configured generation is installed and active.
pub async fn active_service(config: AppConfig) -> (EdgeCacheService, Arc<ScriptedNetwork>) {
    let (edge, network) = service_with(config.clone()).await;
    serve_manifest(&network, &config);
    edge.startup().await.unwrap();
    (edge, network)
}
