//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - any store or in-page cache bound is 0
    /// - any background task interval is 0
    /// - `cache_version` is empty or contains `-`
    /// - `origin` is not an http(s) URL
    ///
    /// Returns `ConfigError::Missing` if the manifest is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        for (field, value) in [
            ("static_max_entries", self.static_max_entries),
            ("dynamic_max_entries", self.dynamic_max_entries),
            ("image_max_entries", self.image_max_entries),
            ("image_cache_size", self.image_cache_size),
            ("component_cache_size", self.component_cache_size),
            ("general_cache_size", self.general_cache_size),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be greater than 0".into() });
            }
        }

        for (field, value) in [
            ("memory_sample_interval_ms", self.memory_sample_interval_ms),
            ("cleanup_interval_ms", self.cleanup_interval_ms),
            ("persist_interval_ms", self.persist_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must be greater than 0ms".into() });
            }
        }

        if self.cache_prefix.is_empty() {
            return Err(ConfigError::Invalid { field: "cache_prefix".into(), reason: "must not be empty".into() });
        }
        if self.cache_version.is_empty() || self.cache_version.contains('-') {
            return Err(ConfigError::Invalid {
                field: "cache_version".into(),
                reason: "must be non-empty and must not contain '-'".into(),
            });
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::Invalid { field: "origin".into(), reason: "must be an http(s) URL".into() });
            }
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.manifest.is_empty() {
            return Err(ConfigError::Missing {
                field: "manifest".into(),
                hint: "List at least one asset in SLIDECACHE_MANIFEST or the config file".into(),
            });
        }

        if !self.manifest.contains(&self.offline_page) {
            tracing::warn!(
                offline_page = %self.offline_page,
                "offline_page is not part of the manifest; navigation fallback will only work once it is cached"
            );
        }

        Ok(())
    }
}
