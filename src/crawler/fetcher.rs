//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured identification headers
//! - GET requests that follow redirects and report the final URL
//! - Timing each request up to the response headers
//! - Classifying the outcome for persistence

use crate::config::UserAgentConfig;
use crate::storage::STATUS_OK;
use crate::{MeshError, Result};
use reqwest::header::{HeaderMap, HeaderValue, FROM, USER_AGENT};
use reqwest::Client;
use std::time::{Duration, Instant};

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// The server answered with HTTP 200
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code (always 200)
        status_code: u16,
        /// Time from request start until the response headers arrived
        elapsed: Duration,
        /// Page body content
        body: String,
    },

    /// The server answered with any other status
    ///
    /// This is persisted as a failed scrape, not treated as exceptional.
    HttpError {
        /// Final URL after redirects
        final_url: String,
        /// The HTTP status code
        status_code: u16,
        /// Time from request start until the response headers arrived
        elapsed: Duration,
    },

    /// Network error (DNS, connection refused, timeout, body read failure)
    NetworkError {
        /// Error description
        error: String,
    },
}

/// Builds an HTTP client with proper configuration
///
/// Every request carries the configured `User-Agent` and `From` headers.
/// Certificate validation is disabled: news sites with broken chains are
/// still part of the graph.
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Optional per-request timeout; `None` imposes none
///
/// # Example
///
/// ```no_run
/// use outlet_mesh::config::UserAgentConfig;
/// use outlet_mesh::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     user_agent: "OutletMesh/1.0 (+https://example.com/about)".to_string(),
///     from: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, None).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Option<Duration>,
) -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_str(&config.user_agent)?);
    headers.insert(FROM, HeaderValue::from_str(&config.from)?);

    let mut builder = Client::builder()
        .default_headers(headers)
        .danger_accept_invalid_certs(true)
        .gzip(true)
        .brotli(true);

    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    Ok(builder.build()?)
}

/// Fetches pages with a shared HTTP client
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Creates a fetcher from the user agent configuration
    pub fn new(config: &UserAgentConfig, timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config, timeout)?,
        })
    }

    /// Fetches a single URL
    pub async fn fetch(&self, url: &str) -> FetchResult {
        fetch_url(&self.client, url).await
    }
}

/// Fetches a URL and classifies the outcome
///
/// # Outcomes
///
/// | Condition | Result |
/// |-----------|--------|
/// | HTTP 200 with a readable body | `Success` |
/// | Any other HTTP status | `HttpError` |
/// | DNS, connect, timeout | `NetworkError` |
/// | Body read failure | `NetworkError` |
///
/// Redirects follow the client's default policy; `final_url` is where
/// they ended.
pub async fn fetch_url(client: &Client, url: &str) -> FetchResult {
    let started = Instant::now();

    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            let error = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                format!("Connection failed: {}", e)
            } else {
                e.to_string()
            };
            return FetchResult::NetworkError { error };
        }
    };

    let elapsed = started.elapsed();
    let status_code = response.status().as_u16();
    let final_url = response.url().to_string();

    if status_code != STATUS_OK {
        return FetchResult::HttpError {
            final_url,
            status_code,
            elapsed,
        };
    }

    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code,
            elapsed,
            body,
        },
        Err(e) => FetchResult::NetworkError {
            error: format!("Failed to read body: {}", e),
        },
    }
}
