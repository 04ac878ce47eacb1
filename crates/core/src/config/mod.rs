//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SLIDECACHE_*)
//! 2. TOML config file (if SLIDECACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::StoreKind;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SLIDECACHE_*)
/// 2. TOML config file (if SLIDECACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding store partitions and durable keys.
    ///
    /// Set via SLIDECACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin that relative asset paths are resolved against.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix shared by every store name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Generation tag stamped into store names.
    ///
    /// Set via SLIDECACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Version stamped into the in-page image cache snapshot.
    #[serde(default = "default_app_version")]
    pub app_version: String,

    /// Assets prefetched into the static partition at install.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Document served to navigations when nothing else can answer.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum response body size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    #[serde(default = "default_static_max_entries")]
    pub static_max_entries: usize,

    #[serde(default = "default_dynamic_max_entries")]
    pub dynamic_max_entries: usize,

    #[serde(default = "default_image_max_entries")]
    pub image_max_entries: usize,

    #[serde(default = "default_client_cache_size")]
    pub image_cache_size: usize,

    #[serde(default = "default_client_cache_size")]
    pub component_cache_size: usize,

    #[serde(default = "default_client_cache_size")]
    pub general_cache_size: usize,

    /// Shrinks the in-page caches for low-memory devices or slow networks.
    ///
    /// Set via SLIDECACHE_CONSTRAINED_DEVICE environment variable.
    #[serde(default)]
    pub constrained_device: bool,

    /// Heap usage that triggers a memory pressure event.
    #[serde(default = "default_memory_threshold_bytes")]
    pub memory_threshold_bytes: u64,

    #[serde(default = "default_memory_sample_interval_ms")]
    pub memory_sample_interval_ms: u64,

    #[serde(default = "default_cleanup_interval_ms")]
    pub cleanup_interval_ms: u64,

    #[serde(default = "default_persist_interval_ms")]
    pub persist_interval_ms: u64,

    /// Pause between two preload items.
    #[serde(default = "default_preload_delay_ms")]
    pub preload_delay_ms: u64,

    /// Pixels the viewport is expanded by before elements count as visible.
    #[serde(default = "default_lazy_root_margin_px")]
    pub lazy_root_margin_px: f32,

    /// Slides farther than this from the current one are unloaded under pressure.
    #[serde(default = "default_slide_retention_distance")]
    pub slide_retention_distance: usize,

    /// Resource URLs of each slide, in presentation order.
    #[serde(default)]
    pub slides: Vec<Vec<String>>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./slidecache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_cache_prefix() -> String {
    "slidecache".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_app_version() -> String {
    env!("CARGO_PKG_VERSION").into()
}

fn default_manifest() -> Vec<String> {
    ["/", "/index.html", "/offline.html", "/css/styles.css", "/js/app.js", "/manifest.json"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_user_agent() -> String {
    "slidecache/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_static_max_entries() -> usize {
    50
}

fn default_dynamic_max_entries() -> usize {
    100
}

fn default_image_max_entries() -> usize {
    200
}

fn default_client_cache_size() -> usize {
    50
}

fn default_memory_threshold_bytes() -> u64 {
    100 * 1024 * 1024
}

fn default_memory_sample_interval_ms() -> u64 {
    10_000
}

fn default_cleanup_interval_ms() -> u64 {
    60_000
}

fn default_persist_interval_ms() -> u64 {
    30_000
}

fn default_preload_delay_ms() -> u64 {
    100
}

fn default_lazy_root_margin_px() -> f32 {
    50.0
}

fn default_slide_retention_distance() -> usize {
    3
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            app_version: default_app_version(),
            manifest: default_manifest(),
            offline_page: default_offline_page(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            static_max_entries: default_static_max_entries(),
            dynamic_max_entries: default_dynamic_max_entries(),
            image_max_entries: default_image_max_entries(),
            image_cache_size: default_client_cache_size(),
            component_cache_size: default_client_cache_size(),
            general_cache_size: default_client_cache_size(),
            constrained_device: false,
            memory_threshold_bytes: default_memory_threshold_bytes(),
            memory_sample_interval_ms: default_memory_sample_interval_ms(),
            cleanup_interval_ms: default_cleanup_interval_ms(),
            persist_interval_ms: default_persist_interval_ms(),
            preload_delay_ms: default_preload_delay_ms(),
            lazy_root_margin_px: default_lazy_root_margin_px(),
            slide_retention_distance: default_slide_retention_distance(),
            slides: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn memory_sample_interval(&self) -> Duration {
        Duration::from_millis(self.memory_sample_interval_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn persist_interval(&self) -> Duration {
        Duration::from_millis(self.persist_interval_ms)
    }

    pub fn preload_delay(&self) -> Duration {
        Duration::from_millis(self.preload_delay_ms)
    }

    /// Maximum entry count of an edge store partition.
    pub fn max_entries(&self, kind: StoreKind) -> usize {
        match kind {
            StoreKind::Static => self.static_max_entries,
            StoreKind::Dynamic => self.dynamic_max_entries,
            StoreKind::Image => self.image_max_entries,
        }
    }

    /// In-page cache bounds as `(image, component, general)`.
    ///
    /// Constrained devices get half of each bound, never below 10.
    pub fn client_cache_sizes(&self) -> (usize, usize, usize) {
        let adjust = |size: usize| if self.constrained_device { (size / 2).max(10).min(size) } else { size };
        (
            adjust(self.image_cache_size),
            adjust(self.component_cache_size),
            adjust(self.general_cache_size),
        )
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SLIDECACHE_`
    /// 2. TOML file from `SLIDECACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SLIDECACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SLIDECACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
