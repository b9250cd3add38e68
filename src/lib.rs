//! Outlet-Mesh: a link-graph crawler for news outlets
//!
//! This crate crawls a seeded set of news-outlet websites, follows outgoing
//! hyperlinks up to a configured depth, and persists a deduplicated directed
//! graph of fetch attempts (scrapes) and hyperlink edges (links).

pub mod config;
pub mod crawler;
pub mod output;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Outlet-Mesh operations
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid request header: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid link selector: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
///
/// None of these are fatal to a crawl: a URL that fails to normalize is
/// simply ignored.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for Outlet-Mesh operations
pub type Result<T> = std::result::Result<T, MeshError>;

// Re-export commonly used types
pub use config::Config;
pub use crate::url::{first_level_domain, normalize_url};
