//! In-page resource management: bounded memo caches, lazy loading,
//! adjacency preloading, memory pressure relief and snapshot persistence.

pub mod lazy;
pub mod manager;
pub mod memory;
pub mod memory_cache;
pub mod persistence;
pub mod preload;

pub use lazy::{AssetKind, DeferredElement, ElementId, LazyLoader, Rect, ViewportObserver, VisibilityObserver};
pub use manager::{
    CacheStats, LazyResolution, ManagerStats, PreloadReport, PressureRelief, Resolved, ResourceManager,
    ResourceManagerConfig,
};
pub use memory::{HeapProbe, HeapSample, MemoryMetrics, MemoryMonitor, PressureEvent, SystemProbe};
pub use memory_cache::{AssetRef, ClientCacheEntry, MemoryCache};
pub use persistence::{PersistedEntry, PersistedSnapshot, PersistenceBridge};
pub use preload::{PreloadQueueItem, PreloadScheduler, SlideDeck, adjacent_slides};
