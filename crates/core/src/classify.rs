//! Resource classification and the fixed strategy table.
//!
//! Every URL maps to exactly one [`ResourceKind`]; unknown shapes fall
//! through to [`ResourceKind::Other`]. Rules are checked in order:
//!
//! 1. `/api/`, `/data/` path prefix or an `api` / `format=json` query marker
//! 2. image extension
//! 3. static extension, the root path, or a static path prefix
//! 4. anything else

use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::StoreKind;

const API_PREFIXES: &[&str] = &["/api/", "/data/"];

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "ico", "avif", "bmp"];

const STATIC_EXTENSIONS: &[&str] = &[
    "html", "htm", "css", "js", "mjs", "json", "webmanifest", "woff", "woff2", "ttf", "otf", "eot",
];

const STATIC_PREFIXES: &[&str] = &["/css/", "/js/", "/assets/", "/static/", "/fonts/", "/components/"];

/// Category of a requested resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Static,
    Image,
    Api,
    Other,
}

/// Resolution protocol bound to a [`ResourceKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

impl ResourceKind {
    pub fn strategy(self) -> Strategy {
        match self {
            ResourceKind::Static | ResourceKind::Image => Strategy::CacheFirst,
            ResourceKind::Api => Strategy::NetworkFirst,
            ResourceKind::Other => Strategy::StaleWhileRevalidate,
        }
    }

    /// Store partition a request of this kind is resolved against.
    pub fn store(self) -> StoreKind {
        match self {
            ResourceKind::Static => StoreKind::Static,
            ResourceKind::Image => StoreKind::Image,
            ResourceKind::Api | ResourceKind::Other => StoreKind::Dynamic,
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirst => "network-first",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
        })
    }
}

/// Classify a request URL. Total: never fails.
pub fn classify(url: &Url) -> ResourceKind {
    let path = url.path().to_ascii_lowercase();

    let api_query = url
        .query_pairs()
        .any(|(k, v)| k == "api" || (k == "format" && v == "json"));
    if api_query || API_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return ResourceKind::Api;
    }

    let extension = extension(&path);
    if extension.is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext)) {
        return ResourceKind::Image;
    }

    if path == "/"
        || extension.is_some_and(|ext| STATIC_EXTENSIONS.contains(&ext))
        || STATIC_PREFIXES.iter().any(|p| path.starts_with(p))
    {
        return ResourceKind::Static;
    }

    ResourceKind::Other
}

fn extension(path: &str) -> Option<&str> {
    let file = path.rsplit('/').next()?;
    let (stem, ext) = file.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() { None } else { Some(ext) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(s: &str) -> ResourceKind {
        classify(&Url::parse(s).unwrap())
    }

    #[test]
    fn test_api_prefixes() {
        assert_eq!(kind("https://deck.test/api/slides"), ResourceKind::Api);
        assert_eq!(kind("https://deck.test/data/slides.json"), ResourceKind::Api);
        assert_eq!(kind("https://deck.test/slides?api=1"), ResourceKind::Api);
        assert_eq!(kind("https://deck.test/slides?format=json"), ResourceKind::Api);
    }

    #[test]
    fn test_api_wins_over_extension() {
        assert_eq!(kind("https://deck.test/api/logo.png"), ResourceKind::Api);
    }

    #[test]
    fn test_images() {
        assert_eq!(kind("https://deck.test/img/cover.PNG"), ResourceKind::Image);
        assert_eq!(kind("https://deck.test/a/b/c.webp?v=2"), ResourceKind::Image);
        assert_eq!(kind("https://deck.test/favicon.ico"), ResourceKind::Image);
    }

    #[test]
    fn test_static() {
        assert_eq!(kind("https://deck.test/"), ResourceKind::Static);
        assert_eq!(kind("https://deck.test/index.html"), ResourceKind::Static);
        assert_eq!(kind("https://deck.test/js/app.js"), ResourceKind::Static);
        assert_eq!(kind("https://deck.test/css/theme"), ResourceKind::Static);
        assert_eq!(kind("https://deck.test/fonts/inter.woff2"), ResourceKind::Static);
    }

    #[test]
    fn test_other_default() {
        assert_eq!(kind("https://deck.test/slides/3"), ResourceKind::Other);
        assert_eq!(kind("https://deck.test/.hidden"), ResourceKind::Other);
        assert_eq!(kind("https://cdn.test/video.mp4"), ResourceKind::Other);
    }

    #[test]
    fn test_strategy_table() {
        assert_eq!(ResourceKind::Static.strategy(), Strategy::CacheFirst);
        assert_eq!(ResourceKind::Image.strategy(), Strategy::CacheFirst);
        assert_eq!(ResourceKind::Api.strategy(), Strategy::NetworkFirst);
        assert_eq!(ResourceKind::Other.strategy(), Strategy::StaleWhileRevalidate);
    }

    #[test]
    fn test_store_table() {
        assert_eq!(ResourceKind::Static.store(), StoreKind::Static);
        assert_eq!(ResourceKind::Image.store(), StoreKind::Image);
        assert_eq!(ResourceKind::Api.store(), StoreKind::Dynamic);
        assert_eq!(ResourceKind::Other.store(), StoreKind::Dynamic);
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(Strategy::StaleWhileRevalidate.to_string(), "stale-while-revalidate");
    }
}
