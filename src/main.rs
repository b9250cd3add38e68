//! Outlet-Mesh main entry point
//!
//! This is the command-line interface for the Outlet-Mesh link-graph crawler.

use anyhow::{Context, Result};
use clap::Parser;
use outlet_mesh::config::{load_config_with_hash, Config};
use outlet_mesh::crawler::{extract_links, parse_selector, run_crawl, FetchResult, Fetcher};
use outlet_mesh::normalize_url;
use outlet_mesh::output::{load_statistics, print_statistics};
use outlet_mesh::storage::SqliteStorage;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Outlet-Mesh: a link-graph crawler for news outlets
///
/// Outlet-Mesh crawls the configured news-outlet websites, follows their
/// outgoing links up to the configured depth and stores the resulting
/// graph of pages and hyperlinks in SQLite.
#[derive(Parser, Debug)]
#[command(name = "outlet-mesh")]
#[command(version = "1.0.0")]
#[command(about = "A link-graph crawler for news outlets", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "check"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "check"])]
    stats: bool,

    /// Fetch a single URL with the configured client and report the result
    #[arg(long, value_name = "URL", conflicts_with_all = ["dry_run", "stats"])]
    check: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(url) = cli.check.as_deref() {
        handle_check(&config, url).await?;
    } else {
        handle_crawl(config, config_hash).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("outlet_mesh=info,warn"),
            1 => EnvFilter::new("outlet_mesh=debug,info"),
            2 => EnvFilter::new("outlet_mesh=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Outlet-Mesh Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers per round: {}", config.crawler.threads);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Rounds: {}", config.crawler.rounds());
    println!("  Link selector: {}", config.crawler.link_selector);
    match config.crawler.request_timeout_secs {
        Some(secs) => println!("  Request timeout: {}s", secs),
        None => println!("  Request timeout: none"),
    }
    println!("  Claim in flight: {}", config.crawler.claim_in_flight);

    println!("\nUser Agent:");
    println!("  User-Agent: {}", config.user_agent.user_agent);
    println!("  From: {}", config.user_agent.from);

    println!("\nDatabase:");
    println!("  Path: {}", config.database.path);
    println!("  Busy timeout: {}ms", config.database.busy_timeout_ms);

    println!("\nOutlets ({}):", config.outlets.len());
    for outlet in &config.outlets {
        println!("  - {} ({}) {}", outlet.name, outlet.country, outlet.url);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl {} outlets in {} rounds",
        config.outlets.len(),
        config.crawler.rounds()
    );
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.database.path);

    let storage = SqliteStorage::new(Path::new(&config.database.path))
        .with_context(|| format!("Failed to open database {}", config.database.path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --check mode: fetches one URL and reports what the crawler sees
async fn handle_check(config: &Config, url: &str) -> Result<()> {
    let url = normalize_url(url, None).with_context(|| format!("Invalid URL {}", url))?;
    let timeout = config.crawler.request_timeout_secs.map(Duration::from_secs);
    let fetcher =
        Fetcher::new(&config.user_agent, timeout).context("Failed to build HTTP client")?;
    let selector = parse_selector(&config.crawler.link_selector)?;

    println!("Fetching {}", url);
    match fetcher.fetch(url.as_str()).await {
        FetchResult::Success {
            final_url,
            status_code,
            elapsed,
            body,
        } => {
            println!("  Status: {} in {:.2}s", status_code, elapsed.as_secs_f64());
            if final_url != url.as_str() {
                println!("  Redirected to: {}", final_url);
            }
            let base = normalize_url(&final_url, None).unwrap_or(url);
            let links = extract_links(&body, &base, &selector);
            println!("  Links extracted: {}", links.len());
        }
        FetchResult::HttpError {
            final_url,
            status_code,
            elapsed,
        } => {
            println!("  Status: {} in {:.2}s", status_code, elapsed.as_secs_f64());
            println!("  Final URL: {}", final_url);
            println!("  This page would be stored as a failed scrape");
        }
        FetchResult::NetworkError { error } => {
            println!("  Unreachable: {}", error);
        }
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> Result<()> {
    tracing::info!(
        "Outlets: {}, workers: {}, max depth: {}",
        config.outlets.len(),
        config.crawler.threads,
        config.crawler.max_depth
    );

    let db_path = PathBuf::from(&config.database.path);

    // Run the crawler
    let summary = run_crawl(config, config_hash)
        .await
        .context("Crawl failed")?;
    tracing::info!(
        "Crawl finished after {} rounds ({} items abandoned after errors)",
        summary.rounds,
        summary.errors
    );

    let storage = SqliteStorage::new(&db_path)?;
    print_statistics(&load_statistics(&storage)?);

    Ok(())
}
