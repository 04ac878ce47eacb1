//! URL canonicalization for consistent cache keys.

/// Error type for URL canonicalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<UrlError> for slidecache_core::Error {
    fn from(err: UrlError) -> Self {
        match err {
            UrlError::Empty => slidecache_core::Error::InvalidInput(err.to_string()),
            other => slidecache_core::Error::InvalidUrl(other.to_string()),
        }
    }
}

/// Canonicalize a URL string, resolving relative paths against `origin`.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Resolve paths like `/img/a.png` against the origin
/// 3. Lowercase the host
/// 4. Remove fragment (#...)
/// 5. Keep query string intact (do not reorder)
pub fn canonicalize(input: &str, origin: &url::Url) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = if trimmed.contains("://") {
        url::Url::parse(trimmed)
    } else {
        origin.join(trimmed)
    }
    .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let host = host.to_lowercase();
        parsed
            .set_host(Some(&host))
            .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> url::Url {
        url::Url::parse("http://localhost:8080").unwrap()
    }

    #[test]
    fn test_canonicalize_absolute() {
        let url = canonicalize("https://deck.test/a.css", &origin()).unwrap();
        assert_eq!(url.as_str(), "https://deck.test/a.css");
    }

    #[test]
    fn test_canonicalize_relative_to_origin() {
        let url = canonicalize("/img/cover.png", &origin()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/img/cover.png");
    }

    #[test]
    fn test_canonicalize_lowercase_host() {
        let url = canonicalize("https://DECK.TEST/", &origin()).unwrap();
        assert_eq!(url.host_str(), Some("deck.test"));
    }

    #[test]
    fn test_canonicalize_remove_fragment() {
        let url = canonicalize("/index.html#slide-4", &origin()).unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/index.html");
    }

    #[test]
    fn test_canonicalize_preserve_query() {
        let url = canonicalize("/api/slides?b=2&a=1", &origin()).unwrap();
        assert_eq!(url.query(), Some("b=2&a=1"));
    }

    #[test]
    fn test_canonicalize_unsupported_scheme() {
        let result = canonicalize("file:///etc/passwd", &origin());
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_canonicalize_whitespace_only() {
        let result = canonicalize("   ", &origin());
        assert!(matches!(result, Err(UrlError::Empty)));
    }
}
