//! Statistics generation from crawl database
//!
//! This module provides functionality for extracting and displaying
//! descriptive statistics of the crawled graph.

use crate::storage::{GraphStore, RunRecord};
use crate::Result;
use chrono::{DateTime, Utc};
use std::fmt::Write;

/// Crawl statistics summary
#[derive(Debug, Clone, Default)]
pub struct CrawlStatistics {
    /// Number of seeded outlets
    pub outlets: u64,

    /// Total number of fetch attempts
    pub scrapes_total: u64,

    /// Fetch attempts that returned HTTP 200
    pub scrapes_successful: u64,

    /// Number of distinct origin FLDs
    pub hosts: u64,

    /// Fewest links found on a single host
    pub min_links_per_host: Option<u64>,

    /// Most links found on a single host
    pub max_links_per_host: Option<u64>,

    /// Links between pages of the same FLD
    pub internal_links: u64,

    /// Links between pages of different FLDs
    pub external_links: u64,

    /// External links whose target is an outlet's page
    pub external_links_to_outlets: u64,

    /// The most recent crawl run, if any
    pub latest_run: Option<RunRecord>,
}

impl CrawlStatistics {
    /// Share of successful scrapes in percent
    pub fn success_percentage(&self) -> f64 {
        if self.scrapes_total == 0 {
            0.0
        } else {
            self.scrapes_successful as f64 / self.scrapes_total as f64 * 100.0
        }
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage session to query
pub fn load_statistics<S: GraphStore + ?Sized>(storage: &S) -> Result<CrawlStatistics> {
    let per_host = storage.link_counts_by_origin()?;

    Ok(CrawlStatistics {
        outlets: storage.count_outlets()?,
        scrapes_total: storage.count_scrapes()?,
        scrapes_successful: storage.count_successful_scrapes()?,
        hosts: per_host.len() as u64,
        min_links_per_host: per_host.iter().map(|(_, count)| *count).min(),
        max_links_per_host: per_host.iter().map(|(_, count)| *count).max(),
        internal_links: storage.count_links(true)?,
        external_links: storage.count_links(false)?,
        external_links_to_outlets: storage.count_external_links_to_outlets()?,
        latest_run: storage.get_latest_run()?,
    })
}

/// Duration of a finished run in seconds
fn run_duration_seconds(run: &RunRecord) -> Option<i64> {
    let started = run.started_at.parse::<DateTime<Utc>>().ok()?;
    let finished = run.finished_at.as_ref()?.parse::<DateTime<Utc>>().ok()?;
    Some((finished - started).num_seconds())
}

/// Renders statistics as human readable text
pub fn format_statistics(stats: &CrawlStatistics) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = writeln!(out, "=== Crawl Statistics ===\n");

    if let Some(run) = &stats.latest_run {
        let _ = write!(out, "Latest run: #{} ({})", run.id, run.status.to_db_string());
        if let Some(seconds) = run_duration_seconds(run) {
            let _ = write!(out, " in {}s", seconds);
        }
        let _ = writeln!(out, "\n");
    }

    let _ = writeln!(out, "Outlets: {}", stats.outlets);
    let _ = writeln!(
        out,
        "Scrapes: {} websites scraped, {} of which ({:.0}%) were successful",
        stats.scrapes_total,
        stats.scrapes_successful,
        stats.success_percentage()
    );

    match (stats.min_links_per_host, stats.max_links_per_host) {
        (Some(min), Some(max)) => {
            let _ = writeln!(
                out,
                "Hosts: {} hosts scraped, containing between {} and {} links",
                stats.hosts, min, max
            );
        }
        _ => {
            let _ = writeln!(out, "Hosts: none scraped");
        }
    }

    let _ = writeln!(
        out,
        "Links: {} internal, {} external ({} of which point to outlets)",
        stats.internal_links, stats.external_links, stats.external_links_to_outlets
    );

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    print!("{}", format_statistics(stats));
}
