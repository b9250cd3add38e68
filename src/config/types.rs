use serde::Deserialize;

/// Main configuration structure for Outlet-Mesh
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub database: DatabaseConfig,
    #[serde(default, rename = "outlet")]
    pub outlets: Vec<OutletEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of concurrent workers per round
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Maximum link depth counted from the outlets (outlets are level 1)
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// CSS selector used to find candidate anchors
    #[serde(rename = "link-selector", default = "default_link_selector")]
    pub link_selector: String,

    /// Per-request timeout in seconds; no timeout when absent
    #[serde(rename = "request-timeout-secs", default)]
    pub request_timeout_secs: Option<u64>,

    /// Skip link targets already claimed by another worker in the same round
    #[serde(rename = "claim-in-flight", default)]
    pub claim_in_flight: bool,
}

impl CrawlerConfig {
    /// Number of rounds a crawl runs: the seed round plus one per level
    pub fn rounds(&self) -> u32 {
        self.max_depth.saturating_add(1)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            max_depth: default_max_depth(),
            link_selector: default_link_selector(),
            request_timeout_secs: None,
            claim_in_flight: false,
        }
    }
}

/// Outbound request identification
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Value of the User-Agent header
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Value of the From header (maintainer contact email)
    pub from: String,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file
    pub path: String,

    /// How long a connection waits on a locked database (milliseconds)
    #[serde(rename = "busy-timeout-ms", default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// A seed news outlet
#[derive(Debug, Clone, Deserialize)]
pub struct OutletEntry {
    pub name: String,
    pub url: String,
    pub country: String,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub reach: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(rename = "is-composite", default)]
    pub is_composite: bool,
}

fn default_threads() -> usize {
    4
}

fn default_max_depth() -> u32 {
    1
}

fn default_link_selector() -> String {
    "a[href]".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    30_000
}
