//! HTML link extraction
//!
//! This module turns a fetched page into the ordered set of outgoing
//! link targets that become graph edges.

use crate::url::normalize_url;
use crate::ConfigError;
use indexmap::IndexSet;
use scraper::{Html, Selector};
use url::Url;

/// Attribute that opts an anchor out of tracking
const NO_TRACK_ATTR: &str = "no_track";

/// href prefixes that never point at a crawlable page
const EXCLUDED_PREFIXES: &[&str] = &[
    "mailto:",
    "ftp:",
    "tlf:",
    "tel:",
    "sip:",
    "sms:",
    "webcal:",
    "file:",
    "#",
    "javascript:",
];

/// Path extensions of media and office documents
const EXCLUDED_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".mov", ".mp4", ".avi", ".pdf", ".doc", ".xls",
    ".docx", ".xlsx",
];

/// Parses the configured anchor selector
pub fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

/// Extracts the outgoing links of a page
///
/// # Link Extraction Rules
///
/// **Include:** elements matched by `selector` that carry an `href`.
///
/// **Exclude:**
/// - Anchors carrying a `no_track` attribute
/// - `mailto:`, `ftp:`, `tlf:`, `tel:`, `sip:`, `sms:`, `webcal:`, `file:`,
///   `javascript:` and fragment-only hrefs
/// - hrefs whose path ends in an image, video or office-document extension
/// - hrefs that fail normalization against `page_url`
///
/// # Returns
///
/// Normalized URLs in document order with duplicates removed
///
/// # Example
///
/// ```
/// use outlet_mesh::crawler::{extract_links, parse_selector};
/// use url::Url;
///
/// let html = r#"<a href="/a">A</a><a href="/a#top">A again</a><a href="/logo.png">Logo</a>"#;
/// let page = Url::parse("https://example.com/").unwrap();
/// let selector = parse_selector("a[href]").unwrap();
///
/// let links = extract_links(html, &page, &selector);
/// assert_eq!(links.len(), 1);
/// assert_eq!(links[0].as_str(), "https://example.com/a");
/// ```
pub fn extract_links(html: &str, page_url: &Url, selector: &Selector) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut links = IndexSet::new();

    for element in document.select(selector) {
        if element.value().attr(NO_TRACK_ATTR).is_some() {
            continue;
        }

        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let href = href.trim();

        if is_excluded(href) {
            continue;
        }

        match normalize_url(href, Some(page_url.as_str())) {
            Ok(url) => {
                links.insert(url);
            }
            Err(e) => {
                tracing::debug!("Ignoring link {} on {}: {}", href, page_url, e);
            }
        }
    }

    links.into_iter().collect()
}

/// Checks the raw href against the excluded prefixes and extensions
fn is_excluded(href: &str) -> bool {
    if href.is_empty() {
        return true;
    }

    let lower = href.to_ascii_lowercase();
    if EXCLUDED_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        return true;
    }

    let path = lower.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
    EXCLUDED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    fn links(html: &str) -> Vec<String> {
        let selector = parse_selector("a[href]").unwrap();
        extract_links(html, &base_url(), &selector)
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_extract_absolute_link() {
        let found = links(r#"<html><body><a href="https://other.com/page">Link</a></body></html>"#);
        assert_eq!(found, vec!["https://other.com/page"]);
    }

    #[test]
    fn test_extract_relative_link() {
        let found = links(r#"<a href="/other">Link</a>"#);
        assert_eq!(found, vec!["https://example.com/other"]);
    }

    #[test]
    fn test_extract_relative_path_link() {
        let found = links(r#"<a href="other">Link</a>"#);
        assert_eq!(found, vec!["https://example.com/other"]);
    }

    #[test]
    fn test_skip_excluded_schemes() {
        let html = r#"
            <a href="javascript:void(0)">JS</a>
            <a href="mailto:test@example.com">Email</a>
            <a href="tel:+4712345678">Call</a>
            <a href="tlf:12345678">Call</a>
            <a href="sms:12345">Text</a>
            <a href="sip:me@example.com">SIP</a>
            <a href="webcal://example.com/cal.ics">Calendar</a>
            <a href="ftp://example.com/file">FTP</a>
            <a href="file:///etc/passwd">File</a>
        "#;
        assert!(links(html).is_empty());
    }

    #[test]
    fn test_skip_fragment_only() {
        let found = links(r##"<a href="#section">Jump</a>"##);
        assert!(found.is_empty());
    }

    #[test]
    fn test_skip_media_extensions() {
        let html = r#"
            <a href="/photo.JPG">Photo</a>
            <a href="/clip.mp4?autoplay=1">Clip</a>
            <a href="/report.pdf#page=2">Report</a>
            <a href="/sheet.xlsx">Sheet</a>
            <a href="/article.html">Article</a>
        "#;
        assert_eq!(links(html), vec!["https://example.com/article.html"]);
    }

    #[test]
    fn test_skip_no_track_anchor() {
        let html = r#"<a href="/tracked">Yes</a><a href="/hidden" no_track>No</a>"#;
        assert_eq!(links(html), vec!["https://example.com/tracked"]);
    }

    #[test]
    fn test_duplicates_removed_in_document_order() {
        let html = r#"
            <a href="/b">B</a>
            <a href="/a">A</a>
            <a href="/b#comments">B again</a>
            <a href="https://EXAMPLE.com/a">A again</a>
        "#;
        assert_eq!(
            links(html),
            vec!["https://example.com/b", "https://example.com/a"]
        );
    }

    #[test]
    fn test_custom_selector() {
        let html = r#"
            <nav><a href="/menu">Menu</a></nav>
            <article><a href="/story">Story</a></article>
        "#;
        let selector = parse_selector("article a[href]").unwrap();
        let found = extract_links(html, &base_url(), &selector);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].as_str(), "https://example.com/story");
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(
            parse_selector("a[[["),
            Err(ConfigError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_mixed_valid_and_invalid_links() {
        let html = r#"
            <a href="/valid">Valid</a>
            <a href="javascript:alert('no')">Invalid</a>
            <a href="http://">Invalid</a>
            <a href="/another-valid">Valid</a>
        "#;
        assert_eq!(links(html).len(), 2);
    }
}
