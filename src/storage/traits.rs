//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{
    LinkRecord, NewLink, NewOutlet, NewScrape, OutletRecord, RunRecord, RunStatus, ScrapeRecord,
};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Outlet not found: {0}")]
    OutletNotFound(i64),

    #[error("Scrape not found: {0}")]
    ScrapeNotFound(i64),

    #[error("Link not found: {0}")]
    LinkNotFound(i64),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// One value of this trait is one session: callers that run concurrently
/// each open their own. Writes made between [`GraphStore::begin`] and
/// [`GraphStore::commit`] become visible to other sessions atomically.
pub trait GraphStore {
    // ===== Transactions =====

    /// Starts a write transaction
    fn begin(&mut self) -> StorageResult<()>;

    /// Commits the open transaction
    fn commit(&mut self) -> StorageResult<()>;

    /// Rolls back the open transaction, if any
    fn rollback(&mut self) -> StorageResult<()>;

    // ===== Run Management =====

    /// Creates a new crawl run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as finished with the given status
    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    // ===== Outlets =====

    /// Inserts an outlet unless one with the same URL exists
    ///
    /// Returns the new ID, or `None` if the URL was already present.
    fn insert_outlet(&mut self, outlet: &NewOutlet) -> StorageResult<Option<i64>>;

    /// Gets an outlet by ID
    fn get_outlet(&self, outlet_id: i64) -> StorageResult<OutletRecord>;

    /// Gets all outlets that have no resolving scrape yet
    fn unvisited_outlets(&self) -> StorageResult<Vec<OutletRecord>>;

    /// Attaches the scrape that resolved an outlet
    fn attach_outlet_scrape(&mut self, outlet_id: i64, scrape_id: i64) -> StorageResult<()>;

    // ===== Scrapes =====

    /// Inserts a scrape and returns the stored record
    fn insert_scrape(&mut self, scrape: &NewScrape) -> StorageResult<ScrapeRecord>;

    /// Gets a scrape by ID
    fn get_scrape(&self, scrape_id: i64) -> StorageResult<ScrapeRecord>;

    /// Gets the earliest-created scrape with status 200 whose requested or
    /// resolved URL equals `url`
    fn earliest_successful_scrape(&self, url: &str) -> StorageResult<Option<ScrapeRecord>>;

    /// Gets every scrape whose requested or resolved URL equals `url`
    fn scrapes_for_url(&self, url: &str) -> StorageResult<Vec<ScrapeRecord>>;

    // ===== Links =====

    /// Inserts a link owned by the given origin scrape
    fn insert_link(&mut self, scrape_origin_id: i64, link: &NewLink) -> StorageResult<LinkRecord>;

    /// Gets a link by ID
    fn get_link(&self, link_id: i64) -> StorageResult<LinkRecord>;

    /// Points a link at its target scrape
    fn set_link_target(&mut self, link_id: i64, scrape_id: i64) -> StorageResult<()>;

    /// Points every link targeting `url` whose target is unresolved or a
    /// failed scrape at `scrape_id`; returns the number of links updated
    fn resolve_links_targeting(&mut self, url: &str, scrape_id: i64) -> StorageResult<u64>;

    /// Increments the error counter of every link targeting `url`; returns
    /// the number of links updated
    fn increment_link_errors(&mut self, url: &str) -> StorageResult<u64>;

    /// Gets all links whose origin is the given scrape
    fn outgoing_links(&self, scrape_id: i64) -> StorageResult<Vec<LinkRecord>>;

    /// Gets all links whose origin scrape is an outlet's scrape
    fn outlet_links(&self) -> StorageResult<Vec<LinkRecord>>;

    // ===== Statistics =====

    /// Counts outlets
    fn count_outlets(&self) -> StorageResult<u64>;

    /// Counts all scrapes
    fn count_scrapes(&self) -> StorageResult<u64>;

    /// Counts scrapes with status 200
    fn count_successful_scrapes(&self) -> StorageResult<u64>;

    /// Counts internal or external links
    fn count_links(&self, internal: bool) -> StorageResult<u64>;

    /// Counts links per origin FLD
    fn link_counts_by_origin(&self) -> StorageResult<Vec<(String, u64)>>;

    /// Counts external links whose target is an outlet's scrape
    fn count_external_links_to_outlets(&self) -> StorageResult<u64>;
}
