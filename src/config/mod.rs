//! Configuration module for Outlet-Mesh
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use outlet_mesh::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("outlet-mesh.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, DatabaseConfig, OutletEntry, UserAgentConfig};

// Re-export parser functions
pub use parser::{load_config, load_config_with_hash, parse_config};
pub use validation::sanitize_country;
