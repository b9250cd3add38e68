//! Crawler module for fetching pages and building the link graph
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching
//! - HTML link extraction
//! - Resolving link targets against already persisted scrapes
//! - The shared frontier and the worker pool draining it
//! - Depth expansion and round coordination

mod coordinator;
mod expansion;
mod fetcher;
mod frontier;
mod parser;
mod resolver;
mod worker;

pub use coordinator::{run_crawl, seed_outlets, Coordinator, CrawlSummary};
pub use expansion::{expand, ExpansionStats};
pub use fetcher::{build_http_client, fetch_url, FetchResult, Fetcher};
pub use frontier::{Frontier, WorkItem};
pub use parser::{extract_links, parse_selector};
pub use resolver::{build_links, fix_up_incoming, record_failure, resolve_or_mark_pending, Resolution};
pub use worker::{CrawlContext, PoolReport, Worker, WorkerPool, WorkerReport};
