//! Storage module for persisting the crawl graph
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Outlet, scrape and link persistence
//! - The lookups the graph resolver and depth expansion depend on
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{GraphStore, StorageError, StorageResult};

/// HTTP status of a successful scrape
pub const STATUS_OK: u16 = 200;

/// A seed news outlet
#[derive(Debug, Clone, PartialEq)]
pub struct OutletRecord {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub fld: String,
    pub tld: Option<String>,
    pub country: String,
    pub area: Option<String>,
    pub reach: Option<String>,
    pub city: Option<String>,
    pub owner: Option<String>,
    pub publisher: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_composite: bool,
    /// The scrape that first resolved this outlet
    pub scrape_id: Option<i64>,
}

/// An outlet about to be inserted
#[derive(Debug, Clone, Default)]
pub struct NewOutlet {
    pub name: String,
    pub url: String,
    pub fld: String,
    pub tld: Option<String>,
    pub country: String,
    pub area: Option<String>,
    pub reach: Option<String>,
    pub city: Option<String>,
    pub owner: Option<String>,
    pub publisher: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_composite: bool,
}

/// One persisted fetch attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeRecord {
    pub id: i64,
    pub created_at: String,
    /// The URL that was requested
    pub url_started: String,
    /// The URL after redirects, if known
    pub url_finished: Option<String>,
    pub status_code: u16,
    pub seconds_elapsed: f64,
}

impl ScrapeRecord {
    /// Returns true if the fetch returned HTTP 200
    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }

    /// The distinct URLs this scrape answers for (requested, then resolved)
    pub fn urls(&self) -> Vec<&str> {
        let mut urls = vec![self.url_started.as_str()];
        if let Some(finished) = self.url_finished.as_deref() {
            if finished != self.url_started {
                urls.push(finished);
            }
        }
        urls
    }
}

/// A fetch attempt about to be inserted
#[derive(Debug, Clone)]
pub struct NewScrape {
    pub url_started: String,
    pub url_finished: Option<String>,
    pub status_code: u16,
    pub seconds_elapsed: f64,
}

/// A directed hyperlink edge discovered during one scrape
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRecord {
    pub id: i64,
    pub url_origin: String,
    pub fld_origin: String,
    pub scrape_origin_id: i64,
    pub url_target: String,
    pub fld_target: String,
    pub is_internal: bool,
    pub scrape_target_id: Option<i64>,
    /// Status code of the target scrape, read alongside the link
    pub target_status: Option<u16>,
    pub erroneous_scrapes: u32,
}

/// Resolution state of a link target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    /// No scrape is attached yet
    Unresolved,
    /// The attached scrape did not return HTTP 200
    Failed,
    /// The attached scrape returned HTTP 200
    Succeeded,
}

impl LinkRecord {
    pub fn target_state(&self) -> TargetState {
        match (self.scrape_target_id, self.target_status) {
            (None, _) => TargetState::Unresolved,
            (Some(_), Some(STATUS_OK)) => TargetState::Succeeded,
            (Some(_), _) => TargetState::Failed,
        }
    }
}

/// A link about to be inserted under its origin scrape
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub url_origin: String,
    pub fld_origin: String,
    pub url_target: String,
    pub fld_target: String,
    pub is_internal: bool,
    pub scrape_target_id: Option<i64>,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
