//! In-page resource manager.
//!
//! Owns the three in-page caches and drives the lazy loader, the preload
//! scheduler, the memory monitor and the persistence bridge. All network
//! access goes through a [`Fetcher`], normally the edge tier.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Serialize;
use slidecache_core::{AppConfig, CacheDb, Error, ResourceKind, ResourceRequest, classify};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use url::Url;

use super::lazy::{AssetKind, DeferredElement, ElementId, LazyLoader, ViewportObserver, VisibilityObserver};
use super::memory::{HeapProbe, MemoryMetrics, MemoryMonitor, PressureEvent, SystemProbe};
use super::memory_cache::{AssetRef, MemoryCache};
use super::persistence::PersistenceBridge;
use super::preload::{PreloadScheduler, SlideDeck};
use crate::fetch::{Fetcher, canonicalize};

/// Settings for [`ResourceManager`], derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct ResourceManagerConfig {
    pub origin: Url,
    pub image_cache_size: usize,
    pub component_cache_size: usize,
    pub general_cache_size: usize,
    pub memory_threshold_bytes: u64,
    pub memory_sample_interval: Duration,
    pub cleanup_interval: Duration,
    pub persist_interval: Duration,
    pub preload_delay: Duration,
    pub lazy_root_margin_px: f32,
    pub slide_retention_distance: usize,
    pub app_version: String,
}

impl ResourceManagerConfig {
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        if [config.memory_sample_interval_ms, config.cleanup_interval_ms, config.persist_interval_ms].contains(&0) {
            return Err(Error::InvalidInput("background intervals must be greater than 0ms".into()));
        }
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {}", config.origin, e)))?;
        let (image_cache_size, component_cache_size, general_cache_size) = config.client_cache_sizes();
        Ok(Self {
            origin,
            image_cache_size,
            component_cache_size,
            general_cache_size,
            memory_threshold_bytes: config.memory_threshold_bytes,
            memory_sample_interval: config.memory_sample_interval(),
            cleanup_interval: config.cleanup_interval(),
            persist_interval: config.persist_interval(),
            preload_delay: config.preload_delay(),
            lazy_root_margin_px: config.lazy_root_margin_px,
            slide_retention_distance: config.slide_retention_distance,
            app_version: config.app_version.clone(),
        })
    }
}

/// A resource resolved by the manager.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved {
    pub asset: AssetRef,
    pub cache: AssetKind,
    pub from_cache: bool,
}

/// Result of resolving one element that entered the viewport.
#[derive(Debug)]
pub struct LazyResolution {
    pub id: ElementId,
    pub result: Result<Resolved, Error>,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct PreloadReport {
    pub completed: Vec<usize>,
    pub cancelled: Vec<usize>,
    pub failed: Vec<usize>,
}

/// What a memory pressure cleanup released.
#[derive(Debug, Clone, Serialize)]
pub struct PressureRelief {
    pub trimmed: usize,
    pub unloaded_slides: Vec<usize>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    pub len: usize,
    pub max_entries: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManagerStats {
    pub image: CacheStats,
    pub component: CacheStats,
    pub general: CacheStats,
    pub current_slide: usize,
    pub preload_queued: Vec<usize>,
    pub preload_loaded: usize,
    pub lazy_pending: usize,
    pub memory: Option<MemoryMetrics>,
    pub under_pressure: bool,
}

struct ClientCaches {
    image: MemoryCache<AssetRef>,
    component: MemoryCache<AssetRef>,
    general: MemoryCache<AssetRef>,
}

impl ClientCaches {
    fn get(&self, kind: AssetKind) -> &MemoryCache<AssetRef> {
        match kind {
            AssetKind::Image => &self.image,
            AssetKind::Component => &self.component,
            AssetKind::General => &self.general,
        }
    }

    fn get_mut(&mut self, kind: AssetKind) -> &mut MemoryCache<AssetRef> {
        match kind {
            AssetKind::Image => &mut self.image,
            AssetKind::Component => &mut self.component,
            AssetKind::General => &mut self.general,
        }
    }

    fn all_mut(&mut self) -> [&mut MemoryCache<AssetRef>; 3] {
        [&mut self.image, &mut self.component, &mut self.general]
    }
}

/// Which in-page cache a slide resource belongs in.
fn asset_kind_for(url: &Url) -> AssetKind {
    match classify(url) {
        ResourceKind::Image => AssetKind::Image,
        _ if url.path().starts_with("/components/") => AssetKind::Component,
        _ => AssetKind::General,
    }
}

pub struct ResourceManager {
    config: ResourceManagerConfig,
    fetcher: Arc<dyn Fetcher>,
    deck: Arc<dyn SlideDeck>,
    probe: Arc<dyn HeapProbe>,
    caches: RwLock<ClientCaches>,
    lazy: Mutex<LazyLoader>,
    scheduler: Mutex<PreloadScheduler>,
    monitor: Mutex<MemoryMonitor>,
    persistence: PersistenceBridge,
    current_slide: AtomicUsize,
}

impl ResourceManager {
    /// Build a manager with the procfs heap probe and a geometry observer.
    pub fn new(
        config: ResourceManagerConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>, deck: Arc<dyn SlideDeck>,
    ) -> Self {
        let caches = ClientCaches {
            image: MemoryCache::new("image", config.image_cache_size),
            component: MemoryCache::new("component", config.component_cache_size),
            general: MemoryCache::new("general", config.general_cache_size),
        };
        let observer = ViewportObserver::new(config.lazy_root_margin_px);
        Self {
            fetcher,
            deck,
            probe: Arc::new(SystemProbe::new()),
            caches: RwLock::new(caches),
            lazy: Mutex::new(LazyLoader::new(Box::new(observer))),
            scheduler: Mutex::new(PreloadScheduler::new()),
            monitor: Mutex::new(MemoryMonitor::new(config.memory_threshold_bytes)),
            persistence: PersistenceBridge::new(db, config.app_version.clone()),
            current_slide: AtomicUsize::new(0),
            config,
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn HeapProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn VisibilityObserver>) -> Self {
        self.lazy = Mutex::new(LazyLoader::new(observer));
        self
    }

    pub fn config(&self) -> &ResourceManagerConfig {
        &self.config
    }

    /// Restore the persisted image cache. Returns the number of restored entries.
    pub async fn start(&self) -> usize {
        let restored = self.persistence.load().await;
        let count = restored.len();
        let mut caches = self.caches.write().await;
        for entry in restored {
            caches.image.insert_at(entry.key, entry.asset, entry.timestamp);
        }
        caches.image.trim();
        tracing::info!(restored = count, version = %self.config.app_version, "resource manager started");
        count
    }

    /// Resolve a resource, from the in-page cache when possible.
    ///
    /// Non-success responses are errors and are never cached.
    pub async fn load(&self, src: &str, kind: AssetKind) -> Result<Resolved, Error> {
        let url = canonicalize(src, &self.config.origin)?;
        let key = url.to_string();

        if let Some(asset) = self.caches.read().await.get(kind).get(&key) {
            return Ok(Resolved { asset: asset.clone(), cache: kind, from_cache: true });
        }

        let response = self.fetcher.fetch(&ResourceRequest::get(url.clone())).await?;
        if !response.is_success() {
            return Err(Error::HttpError(format!("{} returned {}", key, response.status)));
        }

        let asset = AssetRef {
            url: key.clone(),
            kind: classify(&url),
            content_type: response.content_type().map(str::to_string),
            size: response.body.len(),
        };
        self.caches.write().await.get_mut(kind).insert(key, asset.clone());
        tracing::debug!(url = %asset.url, cache = ?kind, size = asset.size, "resource loaded");
        Ok(Resolved { asset, cache: kind, from_cache: false })
    }

    pub async fn register_lazy(&self, element: DeferredElement) -> bool {
        self.lazy.lock().await.register(element)
    }

    /// Resolve every registered element that has entered the viewport.
    pub async fn process_visible(&self) -> Vec<LazyResolution> {
        let entered = self.lazy.lock().await.take_entered();
        let mut resolved = Vec::with_capacity(entered.len());
        for element in entered {
            let result = self.load(&element.src, element.kind).await;
            if let Err(err) = &result {
                tracing::debug!(id = element.id, src = %element.src, error = %err, "lazy load failed");
            }
            resolved.push(LazyResolution { id: element.id, result });
        }
        resolved
    }

    /// Record a navigation and enqueue adjacent slides for preloading.
    pub async fn navigate(&self, current: usize) -> Vec<usize> {
        self.current_slide.store(current, Ordering::SeqCst);
        let total = self.deck.slide_count();
        self.scheduler.lock().await.on_navigate(current, total)
    }

    /// Drain the preload queue one slide at a time, pausing between items.
    ///
    /// Returns immediately if another drain already has an item in flight.
    pub async fn run_preloads(&self) -> PreloadReport {
        let mut report = PreloadReport::default();
        loop {
            let next = self.scheduler.lock().await.next();
            let Some((item, in_flight)) = next else {
                break;
            };
            let index = item.slide_index;

            let outcome = tokio::select! {
                _ = in_flight.cancel.notified() => None,
                result = self.preload_slide(index) => Some(result),
            };

            let mut scheduler = self.scheduler.lock().await;
            match outcome {
                None => {
                    tracing::debug!(slide = index, "preload cancelled");
                    scheduler.complete(index, false);
                    report.cancelled.push(index);
                }
                Some(Ok(resources)) => {
                    tracing::debug!(
                        slide = index,
                        resources,
                        waited_ms = item.enqueued_at.elapsed().as_millis() as u64,
                        "slide preloaded"
                    );
                    scheduler.complete(index, true);
                    report.completed.push(index);
                }
                Some(Err(err)) => {
                    tracing::warn!(slide = index, error = %err, "preload failed");
                    scheduler.complete(index, false);
                    report.failed.push(index);
                }
            }
            let more = !scheduler.queued().is_empty();
            drop(scheduler);

            if more {
                tokio::time::sleep(self.config.preload_delay).await;
            }
        }
        report
    }

    async fn preload_slide(&self, index: usize) -> Result<usize, Error> {
        let resources = self.deck.slide_resources(index);
        for src in &resources {
            let url = canonicalize(src, &self.config.origin)?;
            self.load(url.as_str(), asset_kind_for(&url)).await?;
        }
        Ok(resources.len())
    }

    /// Take one heap sample and run the cleanup cascade on a pressure event.
    pub async fn sample_memory(&self) -> Option<PressureEvent> {
        let sample = self.probe.sample()?;
        let event = self.monitor.lock().await.observe(sample)?;
        self.handle_memory_pressure().await;
        Some(event)
    }

    /// Trim every in-page cache, unload distant slides and hint a collection.
    pub async fn handle_memory_pressure(&self) -> PressureRelief {
        let trimmed: usize = self.caches.write().await.all_mut().into_iter().map(|c| c.trim_aggressive()).sum();

        let current = self.current_slide.load(Ordering::SeqCst);
        let unloaded_slides = self.deck.unload_distant(current, self.config.slide_retention_distance);
        self.scheduler.lock().await.forget(&unloaded_slides);

        self.probe.request_gc();
        tracing::info!(trimmed, unloaded = unloaded_slides.len(), current, "memory pressure cleanup");
        PressureRelief { trimmed, unloaded_slides }
    }

    /// Periodic trim of all three caches.
    pub async fn cleanup(&self) -> usize {
        self.caches.write().await.all_mut().into_iter().map(|c| c.trim()).sum()
    }

    pub async fn persist(&self) -> Result<usize, Error> {
        let caches = self.caches.read().await;
        self.persistence.save(&caches.image).await
    }

    /// Drop everything resolved so far after the underlying data changed.
    pub async fn invalidate(&self) {
        for cache in self.caches.write().await.all_mut() {
            cache.clear();
        }
        self.scheduler.lock().await.reset();
        self.lazy.lock().await.reset_loaded();
        tracing::info!("in-page caches invalidated");
    }

    pub async fn stats(&self) -> ManagerStats {
        let caches = self.caches.read().await;
        let stats = |c: &MemoryCache<AssetRef>| CacheStats { len: c.len(), max_entries: c.max_entries() };
        let scheduler = self.scheduler.lock().await;
        let monitor = self.monitor.lock().await;
        ManagerStats {
            image: stats(&caches.image),
            component: stats(&caches.component),
            general: stats(&caches.general),
            current_slide: self.current_slide.load(Ordering::SeqCst),
            preload_queued: scheduler.queued(),
            preload_loaded: scheduler.loaded_count(),
            lazy_pending: self.lazy.lock().await.pending_count(),
            memory: monitor.last_metrics(),
            under_pressure: monitor.under_pressure(),
        }
    }

    /// Spawn the memory sampling, cleanup and persistence timers.
    pub fn spawn_background(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        let sampler = Arc::clone(self);
        let cleaner = Arc::clone(self);
        let persister = Arc::clone(self);
        vec![
            tokio::spawn(async move {
                let mut ticks = interval(sampler.config.memory_sample_interval);
                loop {
                    ticks.tick().await;
                    sampler.sample_memory().await;
                }
            }),
            tokio::spawn(async move {
                let mut ticks = interval(cleaner.config.cleanup_interval);
                loop {
                    ticks.tick().await;
                    let removed = cleaner.cleanup().await;
                    if removed > 0 {
                        tracing::debug!(removed, "periodic cleanup");
                    }
                }
            }),
            tokio::spawn(async move {
                let mut ticks = interval(persister.config.persist_interval);
                loop {
                    ticks.tick().await;
                    if let Err(err) = persister.persist().await {
                        tracing::warn!(error = %err, "failed to persist image cache");
                    }
                }
            }),
        ]
    }
}

/// Interval whose first tick is one period away.
fn interval(period: Duration) -> tokio::time::Interval {
    let mut ticks = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticks
}
