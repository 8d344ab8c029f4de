//! URL resolution for request and cache keys.
//!
//! Pages refer to resources relative to the application origin (`/`,
//! `/index.html`) while stores key on absolute URLs, so everything that
//! becomes a key goes through [`resolve`].

use url::Url;

/// Error type for URL resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a possibly relative URL against the application origin.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Join relative references onto `base`
/// 3. Reject anything that isn't http or https
/// 4. Remove fragment (#...), keep the query string intact
pub fn resolve(base: &Url, input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// The serialized origin (`scheme://host[:port]`) of a URL.
pub fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://app.test").unwrap()
    }

    #[test]
    fn test_resolve_root() {
        let url = resolve(&base(), "/").unwrap();
        assert_eq!(url.as_str(), "https://app.test/");
    }

    #[test]
    fn test_resolve_relative_path() {
        let url = resolve(&base(), "/index.html").unwrap();
        assert_eq!(url.as_str(), "https://app.test/index.html");
    }

    #[test]
    fn test_resolve_absolute_keeps_host() {
        let url = resolve(&base(), "https://abc123.ngrok-free.app/api/roles").unwrap();
        assert_eq!(url.host_str(), Some("abc123.ngrok-free.app"));
    }

    #[test]
    fn test_resolve_lowercase_host() {
        let url = resolve(&base(), "https://APP.TEST/Dashboard").unwrap();
        assert_eq!(url.host_str(), Some("app.test"));
        assert_eq!(url.path(), "/Dashboard");
    }

    #[test]
    fn test_resolve_remove_fragment() {
        let url = resolve(&base(), "/reports?zone=1#top").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.query(), Some("zone=1"));
    }

    #[test]
    fn test_resolve_trim_whitespace() {
        let url = resolve(&base(), "  /  ").unwrap();
        assert_eq!(url.as_str(), "https://app.test/");
    }

    #[test]
    fn test_resolve_unsupported_scheme() {
        let result = resolve(&base(), "data:image/png;base64,AAAA");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve(&base(), ""), Err(UrlError::Empty)));
        assert!(matches!(resolve(&base(), "   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_origin_of() {
        let url = Url::parse("http://localhost:5173/src/main.tsx").unwrap();
        assert_eq!(origin_of(&url), "http://localhost:5173");
    }
}
