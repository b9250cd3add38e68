//! Crawler coordinator - round orchestration logic
//!
//! This module drives the crawl round by round:
//! - Seeding outlets from the configuration
//! - Spawning a fresh worker pool per round
//! - Enqueuing unvisited outlets and expanding the known link graph
//! - Stopping and joining the pool before the next round starts
//! - Recording the run and its outcome

use crate::config::{sanitize_country, Config, OutletEntry};
use crate::crawler::expansion::{expand, ExpansionStats};
use crate::crawler::frontier::{Frontier, WorkItem};
use crate::crawler::worker::{CrawlContext, PoolReport, WorkerPool};
use crate::storage::{GraphStore, NewOutlet, RunStatus, SqliteStorage};
use crate::url::{first_level_domain, normalize_url, public_suffix};
use crate::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Level of the links found on an outlet's own page
const OUTLET_LINK_LEVEL: u32 = 2;

/// Totals accumulated over all rounds of a crawl
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub rounds: u32,
    pub outlets_enqueued: u64,
    pub expansion: ExpansionStats,
    pub succeeded: u64,
    pub failed: u64,
    pub network_errors: u64,
    pub skipped: u64,
    pub errors: u64,
    pub failed_workers: usize,
    pub leftover: usize,
}

impl CrawlSummary {
    fn absorb_expansion(&mut self, stats: &ExpansionStats) {
        self.expansion.visited += stats.visited;
        self.expansion.enqueued += stats.enqueued;
        self.expansion.late_resolved += stats.late_resolved;
        self.expansion.retries += stats.retries;
    }

    fn absorb_pool(&mut self, report: &PoolReport) {
        for worker in &report.workers {
            self.succeeded += worker.succeeded;
            self.failed += worker.failed;
            self.network_errors += worker.network_errors;
            self.skipped += worker.skipped;
            self.errors += worker.errors;
        }
        self.failed_workers += report.failed_workers;
        self.leftover += report.leftover;
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Config,
    config_hash: String,
    context: Arc<CrawlContext>,
    db_path: PathBuf,
    busy_timeout: Duration,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Builds the HTTP client and link selector up front so that setup
    /// problems surface before any round starts.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `config_hash` - Hash of the configuration file, recorded on the run
    pub fn new(config: Config, config_hash: impl Into<String>) -> Result<Self> {
        let context = Arc::new(CrawlContext::new(&config)?);
        let db_path = PathBuf::from(&config.database.path);
        let busy_timeout = Duration::from_millis(config.database.busy_timeout_ms);

        Ok(Self {
            config,
            config_hash: config_hash.into(),
            context,
            db_path,
            busy_timeout,
        })
    }

    /// Opens a new storage session on the crawl database
    pub fn open_store(&self) -> Result<SqliteStorage> {
        SqliteStorage::open(&self.db_path, self.busy_timeout)
    }

    /// Inserts the configured outlets that are not in the database yet
    pub fn seed(&self) -> Result<u64> {
        let mut store = self.open_store()?;
        seed_outlets(&mut store, &self.config.outlets)
    }

    /// Runs every round and records the run
    pub async fn run(&self) -> Result<CrawlSummary> {
        let mut store = self.open_store()?;
        let run_id = store.create_run(&self.config_hash)?;
        let start_time = Instant::now();

        tracing::info!(
            "Starting crawl run {} with {} workers, max depth {}",
            run_id,
            self.config.crawler.threads,
            self.config.crawler.max_depth
        );

        let result = self.run_rounds().await;

        match &result {
            Ok(summary) => {
                store.finish_run(run_id, RunStatus::Completed)?;
                tracing::info!(
                    "Crawl completed in {:?}: {} successful, {} failed, {} unreachable fetches",
                    start_time.elapsed(),
                    summary.succeeded,
                    summary.failed,
                    summary.network_errors
                );
            }
            Err(e) => {
                tracing::error!("Crawl run {} failed: {}", run_id, e);
                store.finish_run(run_id, RunStatus::Failed)?;
            }
        }

        result
    }

    async fn run_rounds(&self) -> Result<CrawlSummary> {
        let mut summary = CrawlSummary::default();
        let rounds = self.config.crawler.rounds();

        for round in 0..rounds {
            tracing::info!("Round {} of {}", round + 1, rounds);
            self.run_round(&mut summary).await?;
            summary.rounds += 1;
        }

        Ok(summary)
    }

    /// Runs one round: spawn, enqueue, stop, join
    async fn run_round(&self, summary: &mut CrawlSummary) -> Result<()> {
        self.context.reset_claims();

        let frontier = Arc::new(Frontier::new());
        let pool = WorkerPool::spawn(
            self.config.crawler.threads,
            Arc::clone(&self.context),
            Arc::clone(&frontier),
            || self.open_store(),
        )?;
        tracing::debug!("Spawned {} workers", pool.size());

        // The pool is always joined, even when enqueuing fails
        let enqueued = self.enqueue_round(&frontier);
        let report = pool.shutdown().await;
        summary.absorb_pool(&report);

        let (outlets, expansion) = enqueued?;
        summary.outlets_enqueued += outlets;
        summary.absorb_expansion(&expansion);

        tracing::info!(
            "Round finished: {} outlets and {} links enqueued, {} resolved without fetching",
            outlets,
            expansion.enqueued,
            expansion.late_resolved
        );
        if report.leftover > 0 || report.failed_workers > 0 {
            tracing::warn!(
                "{} workers failed, {} items left unprocessed",
                report.failed_workers,
                report.leftover
            );
        }

        Ok(())
    }

    /// Pushes this round's work onto the frontier
    fn enqueue_round(&self, frontier: &Frontier) -> Result<(u64, ExpansionStats)> {
        let mut store = self.open_store()?;

        let outlets = store.unvisited_outlets()?;
        let outlet_count = outlets.len() as u64;
        for outlet in outlets {
            frontier.push(WorkItem::Outlet(outlet));
        }
        if outlet_count > 0 {
            tracing::info!("Added {} unvisited outlets", outlet_count);
        }

        let max_depth = self.config.crawler.max_depth;
        let expansion = if max_depth > 1 {
            let links = store.outlet_links()?;
            expand(&mut store, frontier, links, OUTLET_LINK_LEVEL, max_depth)?
        } else {
            ExpansionStats::default()
        };

        Ok((outlet_count, expansion))
    }
}

/// Inserts outlets by URL unless already present
///
/// URLs are normalized, countries sanitized, and FLD and public suffix
/// derived from the URL. Returns the number of outlets inserted.
pub fn seed_outlets<S: GraphStore + ?Sized>(
    store: &mut S,
    entries: &[OutletEntry],
) -> Result<u64> {
    store.begin()?;
    match insert_outlets(store, entries) {
        Ok(inserted) => {
            store.commit()?;
            tracing::info!(
                "Seeded {} new outlets ({} configured)",
                inserted,
                entries.len()
            );
            Ok(inserted)
        }
        Err(e) => {
            store.rollback()?;
            Err(e)
        }
    }
}

fn insert_outlets<S: GraphStore + ?Sized>(
    store: &mut S,
    entries: &[OutletEntry],
) -> Result<u64> {
    let mut inserted = 0;
    for entry in entries {
        let url = normalize_url(&entry.url, None)?;
        let outlet = NewOutlet {
            name: entry.name.trim().to_string(),
            fld: first_level_domain(&url).unwrap_or_default(),
            tld: public_suffix(&url),
            url: url.to_string(),
            country: sanitize_country(&entry.country),
            area: entry.area.clone(),
            reach: entry.reach.clone(),
            city: entry.city.clone(),
            owner: entry.owner.clone(),
            publisher: entry.publisher.clone(),
            latitude: entry.latitude,
            longitude: entry.longitude,
            is_composite: entry.is_composite,
        };

        if store.insert_outlet(&outlet)?.is_some() {
            inserted += 1;
        } else {
            tracing::debug!("Outlet {} already present", outlet.url);
        }
    }
    Ok(inserted)
}

/// Runs the main crawl operation
///
/// This function orchestrates the entire crawl process:
///
/// 1. Build the HTTP client and link selector
/// 2. Seed outlets that are not in the database yet
/// 3. Run `max_depth + 1` rounds, each of which:
///    a. Spawns the worker pool
///    b. Enqueues unvisited outlets
///    c. Expands the link graph from the outlets' pages
///    d. Stops and joins every worker
/// 4. Mark the run as completed or failed
///
/// # Example
///
/// ```no_run
/// use outlet_mesh::config::load_config_with_hash;
/// use outlet_mesh::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("outlet-mesh.toml"))?;
/// let summary = run_crawl(config, hash).await?;
/// println!("{} rounds", summary.rounds);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, config_hash: String) -> Result<CrawlSummary> {
    let coordinator = Coordinator::new(config, config_hash)?;
    coordinator.seed()?;
    coordinator.run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn entry(name: &str, url: &str, country: &str) -> OutletEntry {
        OutletEntry {
            name: name.to_string(),
            url: url.to_string(),
            country: country.to_string(),
            area: None,
            reach: Some("national".to_string()),
            city: None,
            owner: None,
            publisher: None,
            latitude: Some(59.91),
            longitude: Some(10.75),
            is_composite: false,
        }
    }

    fn create_test_config(db_path: &std::path::Path, max_depth: u32) -> Config {
        parse_config(&format!(
            r#"
[crawler]
threads = 2
max-depth = {}

[user-agent]
user-agent = "TestCrawler/1.0"
from = "admin@example.com"

[database]
path = "{}"
"#,
            max_depth,
            db_path.display()
        ))
        .unwrap()
    }

    #[test]
    fn test_seed_outlets_normalizes_and_sanitizes() {
        let mut store = SqliteStorage::new_in_memory().unwrap();
        let entries = vec![
            entry("Aftenposten", "www.aftenposten.no#front", "norway"),
            entry("BBC", "https://www.bbc.co.uk/news", "united kingdom"),
        ];

        let inserted = seed_outlets(&mut store, &entries).unwrap();
        assert_eq!(inserted, 2);

        let outlets = store.unvisited_outlets().unwrap();
        assert_eq!(outlets[0].url, "http://www.aftenposten.no/");
        assert_eq!(outlets[0].fld, "aftenposten.no");
        assert_eq!(outlets[0].tld.as_deref(), Some("no"));
        assert_eq!(outlets[0].country, "Norway");
        assert_eq!(outlets[0].reach.as_deref(), Some("national"));

        assert_eq!(outlets[1].fld, "bbc.co.uk");
        assert_eq!(outlets[1].tld.as_deref(), Some("co.uk"));
        assert_eq!(outlets[1].country, "Other: United kingdom");
    }

    #[test]
    fn test_seed_outlets_skips_existing() {
        let mut store = SqliteStorage::new_in_memory().unwrap();
        let entries = vec![entry("Example", "https://example.com/", "Sweden")];

        assert_eq!(seed_outlets(&mut store, &entries).unwrap(), 1);
        assert_eq!(seed_outlets(&mut store, &entries).unwrap(), 0);
        assert_eq!(store.count_outlets().unwrap(), 1);
    }

    #[test]
    fn test_seed_outlets_rolls_back_on_bad_url() {
        let mut store = SqliteStorage::new_in_memory().unwrap();
        let entries = vec![
            entry("Good", "https://example.com/", "Denmark"),
            entry("Bad", "ftp://example.org/", "Denmark"),
        ];

        assert!(seed_outlets(&mut store, &entries).is_err());
        assert_eq!(store.count_outlets().unwrap(), 0);
    }

    #[test]
    fn test_summary_absorbs_reports() {
        let mut summary = CrawlSummary::default();
        summary.absorb_expansion(&ExpansionStats {
            visited: 3,
            enqueued: 2,
            late_resolved: 1,
            retries: 1,
        });
        summary.absorb_pool(&PoolReport {
            workers: vec![
                crate::crawler::WorkerReport {
                    succeeded: 2,
                    failed: 1,
                    ..Default::default()
                },
                crate::crawler::WorkerReport {
                    succeeded: 1,
                    network_errors: 1,
                    ..Default::default()
                },
            ],
            failed_workers: 0,
            leftover: 0,
        });

        assert_eq!(summary.expansion.enqueued, 2);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.network_errors, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_run_without_outlets_completes() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config(&dir.path().join("mesh.db"), 2);

        let coordinator = Coordinator::new(config, "hash").unwrap();
        let summary = coordinator.run().await.unwrap();

        assert_eq!(summary.rounds, 3);
        assert_eq!(summary.outlets_enqueued, 0);
        assert_eq!(summary.leftover, 0);

        let store = coordinator.open_store().unwrap();
        let run = store.get_latest_run().unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.config_hash, "hash");
    }
}
