//! Output module for reporting crawl results
//!
//! This module handles descriptive statistics of the crawled graph,
//! loaded from storage and printed after a crawl or on demand.

pub mod stats;

pub use stats::{format_statistics, load_statistics, print_statistics, CrawlStatistics};
