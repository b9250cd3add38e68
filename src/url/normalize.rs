use crate::url::first_level_domain;
use crate::UrlError;
use url::Url;

/// Normalizes a URL according to Outlet-Mesh's normalization rules
///
/// # Normalization Steps
///
/// 1. If the URL is not absolute (`http:`/`https:`) and a non-empty base is
///    given, resolve it relative to the base
/// 2. Repair a missing protocol: `//host/...` and bare domains get `http:`
/// 3. Parse; only HTTP and HTTPS are accepted
/// 4. Require a host with a first-level domain
/// 5. Remove the fragment (everything after #)
///
/// Host lowercasing, default-port removal and empty-path-to-`/` come from
/// the URL parser itself. Applying the function to its own output yields
/// the same URL.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
/// * `base` - Optional base URL for relative references
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - The URL should be ignored
///
/// # Examples
///
/// ```
/// use outlet_mesh::url::normalize_url;
///
/// let url = normalize_url("about#team", Some("https://Example.com/news/")).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/news/about");
///
/// let url = normalize_url("example.com/page", None).unwrap();
/// assert_eq!(url.as_str(), "http://example.com/page");
/// ```
pub fn normalize_url(url_str: &str, base: Option<&str>) -> Result<Url, UrlError> {
    let url_str = url_str.trim();
    if url_str.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    // Step 1 & 2: Resolve against the base or repair the protocol
    let base = base.map(str::trim).filter(|b| !b.is_empty());
    let mut url = match base {
        Some(base) if !is_absolute(url_str) => {
            let base = Url::parse(&repair_scheme(base)).map_err(|e| UrlError::Parse(e.to_string()))?;
            base.join(url_str)
                .map_err(|e| UrlError::Parse(e.to_string()))?
        }
        _ => {
            if url_str.starts_with('/') && !url_str.starts_with("//") {
                return Err(UrlError::Parse(format!(
                    "relative URL without base: {}",
                    url_str
                )));
            }
            Url::parse(&repair_scheme(url_str)).map_err(|e| UrlError::Parse(e.to_string()))?
        }
    };

    // Step 3: Validate scheme
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    // Step 4: Require a registrable domain
    if url.host().is_none() || first_level_domain(&url).is_none() {
        return Err(UrlError::MissingDomain);
    }

    // Step 5: Remove fragment
    url.set_fragment(None);

    Ok(url)
}

/// Returns true if the string already carries a web scheme
fn is_absolute(url_str: &str) -> bool {
    let lower = url_str.get(..6).unwrap_or(url_str).to_ascii_lowercase();
    lower.starts_with("http:") || lower.starts_with("https:")
}

/// Adds `http:` to protocol-relative and scheme-less URLs
fn repair_scheme(url_str: &str) -> String {
    if url_str.starts_with("//") {
        format!("http:{}", url_str)
    } else if url_str.contains("://") || has_opaque_scheme(url_str) {
        url_str.to_string()
    } else {
        format!("http://{}", url_str)
    }
}

/// Detects `mailto:`-style schemes while treating `host:8080` as a port
fn has_opaque_scheme(url_str: &str) -> bool {
    match url_str.split_once(':') {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
                && !rest.starts_with(|c: char| c.is_ascii_digit())
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_url_unchanged() {
        let result = normalize_url("https://example.com/page?a=1", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?a=1");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize_url("https://example.com/page#section", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_lowercase_host_keeps_path_case() {
        let result = normalize_url("https://EXAMPLE.COM/Page", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = normalize_url("https://example.com", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_bare_domain_gets_http() {
        let result = normalize_url("example.com/news", None).unwrap();
        assert_eq!(result.as_str(), "http://example.com/news");
    }

    #[test]
    fn test_bare_domain_with_port_gets_http() {
        let result = normalize_url("example.com:8080/news", None).unwrap();
        assert_eq!(result.as_str(), "http://example.com:8080/news");
    }

    #[test]
    fn test_protocol_relative_without_base() {
        let result = normalize_url("//cdn.example.com/a", None).unwrap();
        assert_eq!(result.as_str(), "http://cdn.example.com/a");
    }

    #[test]
    fn test_protocol_relative_inherits_base_scheme() {
        let result = normalize_url("//other.org/a", Some("https://example.com/")).unwrap();
        assert_eq!(result.as_str(), "https://other.org/a");
    }

    #[test]
    fn test_relative_path_with_base() {
        let result = normalize_url("other", Some("https://example.com/dir/page")).unwrap();
        assert_eq!(result.as_str(), "https://example.com/dir/other");
    }

    #[test]
    fn test_root_relative_with_base() {
        let result = normalize_url("/about", Some("https://example.com/dir/page")).unwrap();
        assert_eq!(result.as_str(), "https://example.com/about");
    }

    #[test]
    fn test_absolute_url_ignores_base() {
        let result = normalize_url("http://other.org/x", Some("https://example.com/")).unwrap();
        assert_eq!(result.as_str(), "http://other.org/x");
    }

    #[test]
    fn test_empty_base_is_no_base() {
        let result = normalize_url("/about", Some(""));
        assert!(matches!(result, Err(UrlError::Parse(_))));
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize_url("ftp://example.com/file", None);
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));

        let result = normalize_url("mailto:someone@example.com", Some("https://example.com/"));
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_missing_domain() {
        assert_eq!(
            normalize_url("http://localhost:3000/", None),
            Err(UrlError::MissingDomain)
        );
        assert_eq!(normalize_url("https://co.uk/", None), Err(UrlError::MissingDomain));
    }

    #[test]
    fn test_empty_url() {
        assert!(normalize_url("   ", None).is_err());
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let cases = [
            ("https://Example.com/a/../b?q=1#frag", None),
            ("example.com", None),
            ("//news.example.org/x#y", None),
            ("sub/page.html?x=y", Some("http://www.example.no/a/b")),
            ("../up", Some("https://example.se/one/two/")),
            ("http://127.0.0.1:8080/page#top", None),
        ];

        for (raw, base) in cases {
            let once = normalize_url(raw, base).unwrap();
            let twice = normalize_url(once.as_str(), None).unwrap();
            assert_eq!(once, twice, "normalization of {} is not idempotent", raw);
        }
    }
}
