use url::{Host, Url};

/// Extracts the first-level (registrable) domain of a URL
///
/// The registrable domain is determined with the public suffix list, so
/// `https://a.b.example.co.uk/` yields `example.co.uk`. Hosts that are IP
/// literals have no registrable domain and are used as-is, which keeps
/// locally hosted pages addressable as graph nodes.
///
/// # Arguments
///
/// * `url` - The URL to extract the domain from
///
/// # Returns
///
/// * `Some(String)` - The lowercase first-level domain
/// * `None` - If the URL has no host or the host is itself a public suffix
///
/// # Examples
///
/// ```
/// use url::Url;
/// use outlet_mesh::url::first_level_domain;
///
/// let url = Url::parse("https://news.example.co.uk/path").unwrap();
/// assert_eq!(first_level_domain(&url), Some("example.co.uk".to_string()));
/// ```
pub fn first_level_domain(url: &Url) -> Option<String> {
    let fld = match url.host() {
        Some(Host::Domain(host)) => {
            let host = host.trim_end_matches('.').to_lowercase();
            psl::domain_str(&host).map(str::to_string)
        }
        Some(Host::Ipv4(addr)) => Some(addr.to_string()),
        Some(Host::Ipv6(addr)) => Some(format!("[{}]", addr)),
        None => None,
    };

    if fld.is_none() {
        tracing::debug!("No first-level domain for {}", url);
    }

    fld
}

/// Extracts the public suffix (top-level domain) of a URL, e.g. `co.uk`
pub fn public_suffix(url: &Url) -> Option<String> {
    match url.host() {
        Some(Host::Domain(host)) => {
            let host = host.trim_end_matches('.').to_lowercase();
            psl::suffix_str(&host).map(str::to_string)
        }
        _ => None,
    }
}
