//! Graph resolver
//!
//! Decides which existing scrape a link target URL points at and keeps
//! links consistent as new scrapes land. URLs are matched by exact string
//! equality against a scrape's requested or resolved URL.

use crate::storage::{GraphStore, NewLink, ScrapeRecord, StorageResult};
use crate::url::{first_level_domain, is_internal};
use std::collections::HashSet;
use url::Url;

/// Outcome of looking a target URL up in the graph
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A successful scrape answers for the URL
    Resolved(ScrapeRecord),
    /// Nothing successful yet; the URL still has to be fetched
    Pending,
}

impl Resolution {
    /// ID of the resolving scrape, if any
    pub fn scrape_id(&self) -> Option<i64> {
        match self {
            Self::Resolved(scrape) => Some(scrape.id),
            Self::Pending => None,
        }
    }
}

/// Looks up the earliest successful scrape for `url`
///
/// Two workers may both see `Pending` for the same URL and both fetch it;
/// the earliest scrape wins every later lookup.
pub fn resolve_or_mark_pending<S: GraphStore + ?Sized>(
    store: &S,
    url: &str,
) -> StorageResult<Resolution> {
    Ok(match store.earliest_successful_scrape(url)? {
        Some(scrape) => Resolution::Resolved(scrape),
        None => Resolution::Pending,
    })
}

/// Points older links at a freshly persisted successful scrape
///
/// Every link whose target URL is the scrape's requested or resolved URL
/// and whose target is unresolved or a failed scrape is updated. Returns
/// the number of links changed.
pub fn fix_up_incoming<S: GraphStore + ?Sized>(
    store: &mut S,
    scrape: &ScrapeRecord,
) -> StorageResult<u64> {
    let mut updated = 0;
    for url in scrape.urls() {
        updated += store.resolve_links_targeting(url, scrape.id)?;
    }
    if updated > 0 {
        tracing::debug!(
            "Scrape {} resolved {} earlier links to {}",
            scrape.id,
            updated,
            scrape.url_started
        );
    }
    Ok(updated)
}

/// Counts a failed fetch against every link targeting one of `urls`
///
/// Each distinct URL is counted once, so a link is incremented once per
/// failure even when requested and resolved URL coincide.
pub fn record_failure<S: GraphStore + ?Sized>(store: &mut S, urls: &[&str]) -> StorageResult<u64> {
    let mut seen = HashSet::new();
    let mut updated = 0;
    for url in urls {
        if seen.insert(*url) {
            updated += store.increment_link_errors(url)?;
        }
    }
    Ok(updated)
}

/// Builds the link edges of one page
///
/// The origin FLD comes from the page's resolved URL, the target FLD from
/// each target; a link is internal iff both are equal and non-empty. Each
/// target is resolved against the existing graph.
pub fn build_links<S: GraphStore + ?Sized>(
    store: &S,
    origin: &Url,
    targets: &[Url],
) -> StorageResult<Vec<NewLink>> {
    let fld_origin = first_level_domain(origin).unwrap_or_default();

    targets
        .iter()
        .map(|target| {
            let fld_target = first_level_domain(target).unwrap_or_default();
            let resolution = resolve_or_mark_pending(store, target.as_str())?;
            Ok(NewLink {
                url_origin: origin.to_string(),
                fld_origin: fld_origin.clone(),
                url_target: target.to_string(),
                is_internal: is_internal(&fld_origin, &fld_target),
                fld_target,
                scrape_target_id: resolution.scrape_id(),
            })
        })
        .collect()
}
