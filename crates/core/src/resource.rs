//! Request and response values exchanged between the tiers.
//!
//! A `ResourceRequest` is what a collaborator asks for; a `ResourceResponse`
//! is what comes back, whether it was read from a store, fetched, or
//! synthesized by the offline fallback.

use bytes::Bytes;
use url::Url;

use crate::cache::hash::compute_cache_key;

/// Whether a request loads a whole document or a subresource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Full-page navigation.
    Navigate,
    #[default]
    Subresource,
}

/// An outgoing resource request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub method: String,
    pub url: Url,
    /// `Accept` header, the only header that varies a cache key.
    pub accept: Option<String>,
    pub mode: RequestMode,
}

impl ResourceRequest {
    /// A plain GET subresource request.
    pub fn get(url: Url) -> Self {
        Self { method: "GET".into(), url, accept: None, mode: RequestMode::Subresource }
    }

    /// A GET navigation request.
    pub fn navigate(url: Url) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url) }
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    /// Whether the cache layer may intercept this request at all.
    ///
    /// Non-GET requests and non-http(s) schemes pass through untouched.
    pub fn is_interceptable(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET") && matches!(self.url.scheme(), "http" | "https")
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Canonical identity of this request inside a store.
    pub fn cache_key(&self) -> String {
        compute_cache_key(
            &self.method.to_ascii_uppercase(),
            self.url.as_str(),
            self.accept.as_deref().unwrap_or(""),
        )
    }
}

/// A resolved response: status, headers and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceResponse {
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ResourceResponse {
    pub fn new(url: impl Into<String>, status: u16, headers: Vec<(String, String)>, body: impl Into<Bytes>) -> Self {
        Self { url: url.into(), status, headers, body: body.into() }
    }

    /// Only 2xx responses are ever written to a store.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Structured failure returned when nothing can answer a request.
    pub fn offline_error(url: impl Into<String>, message: &str) -> Self {
        let body = serde_json::json!({ "error": "offline", "message": message }).to_string();
        Self::new(url, 503, vec![("content-type".into(), "application/json".into())], body)
    }
}
