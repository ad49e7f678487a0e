//! URL normalization for matching request URLs against manifest entries.

use url::Url;

/// Error type for URL normalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Normalize an absolute request URL so it compares equal to manifest entries.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Parse as an absolute URL (no scheme defaulting)
/// 3. Require http or https
/// 4. Lowercase the host
/// 5. Remove fragment (#...)
/// 6. Keep query string intact (do not reorder)
pub fn normalize(input: &str) -> Result<Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if let Some(host) = parsed.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host {
            parsed
                .set_host(Some(&lowered))
                .map_err(|e| UrlError::InvalidUrl(e.to_string()))?;
        }
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Whether two URLs share scheme, host and port.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.origin() == b.origin()
}

/// Scheme of a raw URL string, lower-cased, without parsing the rest.
pub fn scheme_of(input: &str) -> Option<String> {
    let (scheme, _) = input.trim().split_once(':')?;
    let valid = !scheme.is_empty()
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| scheme.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        let url = normalize("https://app.test/index.html").unwrap();
        assert_eq!(url.as_str(), "https://app.test/index.html");
    }

    #[test]
    fn test_normalize_lowercase_host() {
        let url = normalize("https://APP.TEST/Index.html").unwrap();
        assert_eq!(url.host_str(), Some("app.test"));
        assert_eq!(url.path(), "/Index.html");
    }

    #[test]
    fn test_normalize_remove_fragment() {
        let url = normalize("https://app.test/page.html#section").unwrap();
        assert_eq!(url.fragment(), None);
        assert_eq!(url.as_str(), "https://app.test/page.html");
    }

    #[test]
    fn test_normalize_preserve_query() {
        let url = normalize("https://app.test/?b=2&a=1").unwrap();
        assert_eq!(url.query(), Some("b=2&a=1"));
    }

    #[test]
    fn test_normalize_trim_whitespace() {
        let url = normalize("  https://app.test  ").unwrap();
        assert_eq!(url.as_str(), "https://app.test/");
    }

    #[test]
    fn test_normalize_relative_rejected() {
        assert!(matches!(normalize("/index.html"), Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_normalize_unsupported_scheme() {
        let result = normalize("chrome-extension://abc/script.js");
        assert!(matches!(result, Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_normalize_empty() {
        assert!(matches!(normalize("   "), Err(UrlError::Empty)));
    }

    #[test]
    fn test_same_origin() {
        let a = normalize("https://app.test/a").unwrap();
        let b = normalize("https://app.test/b?x=1").unwrap();
        let c = normalize("http://app.test/a").unwrap();
        let d = normalize("https://app.test:8443/a").unwrap();
        assert!(same_origin(&a, &b));
        assert!(!same_origin(&a, &c));
        assert!(!same_origin(&a, &d));
    }

    #[test]
    fn test_scheme_of() {
        assert_eq!(scheme_of("HTTPS://app.test/"), Some("https".to_string()));
        assert_eq!(scheme_of("chrome-extension://abc/"), Some("chrome-extension".to_string()));
        assert_eq!(scheme_of("/relative"), None);
        assert_eq!(scheme_of("1http://x"), None);
    }
}
