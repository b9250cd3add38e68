//! Crawl workers
//!
//! Each worker pops items from the shared frontier, fetches the URL they
//! name and persists the outcome through its own storage session. A
//! `Stop` item ends the worker.

use crate::config::Config;
use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::crawler::frontier::{Frontier, WorkItem};
use crate::crawler::parser::{extract_links, parse_selector};
use crate::crawler::resolver::{build_links, fix_up_incoming, record_failure};
use crate::storage::{GraphStore, LinkRecord, NewScrape, OutletRecord, ScrapeRecord};
use crate::url::normalize_url;
use crate::Result;
use scraper::Selector;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Everything a worker needs besides its storage session
#[derive(Debug)]
pub struct CrawlContext {
    fetcher: Fetcher,
    selector: Selector,
    claim_in_flight: bool,
    claimed: Mutex<HashSet<String>>,
}

impl CrawlContext {
    /// Builds the context from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let timeout = config.crawler.request_timeout_secs.map(Duration::from_secs);
        let fetcher = Fetcher::new(&config.user_agent, timeout)?;
        let selector = parse_selector(&config.crawler.link_selector)?;
        Ok(Self::from_parts(
            fetcher,
            selector,
            config.crawler.claim_in_flight,
        ))
    }

    /// Builds the context from already constructed parts
    pub fn from_parts(fetcher: Fetcher, selector: Selector, claim_in_flight: bool) -> Self {
        Self {
            fetcher,
            selector,
            claim_in_flight,
            claimed: Mutex::new(HashSet::new()),
        }
    }

    /// Claims `url` for fetching in the current round
    ///
    /// Always true when claiming is disabled; otherwise true only for the
    /// first caller per URL until [`CrawlContext::reset_claims`].
    pub fn claim(&self, url: &str) -> bool {
        if !self.claim_in_flight {
            return true;
        }
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string())
    }

    /// Forgets every claim; called between rounds
    pub fn reset_claims(&self) {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Per-worker counters reported at shutdown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    /// Outlet items processed
    pub outlets: u64,
    /// Link items processed
    pub links: u64,
    /// Fetches persisted as successful scrapes
    pub succeeded: u64,
    /// Fetches persisted as failed scrapes
    pub failed: u64,
    /// Fetches that never got a response
    pub network_errors: u64,
    /// Link items skipped because their URL was already claimed
    pub skipped: u64,
    /// Items abandoned after an internal error
    pub errors: u64,
}

/// A single crawl worker owning one storage session
pub struct Worker<S> {
    store: S,
    context: Arc<CrawlContext>,
    frontier: Arc<Frontier>,
    report: WorkerReport,
}

impl<S: GraphStore> Worker<S> {
    pub fn new(id: usize, store: S, context: Arc<CrawlContext>, frontier: Arc<Frontier>) -> Self {
        Self {
            store,
            context,
            frontier,
            report: WorkerReport {
                worker_id: id,
                ..Default::default()
            },
        }
    }

    /// Processes items until a `Stop` arrives
    pub async fn run(mut self) -> WorkerReport {
        tracing::debug!("Worker {} started", self.report.worker_id);

        while let Some(item) = self.frontier.pop().await {
            if item == WorkItem::Stop {
                break;
            }
            self.process(item).await;
        }

        tracing::debug!("Worker {} stopped", self.report.worker_id);
        self.report
    }

    /// Processes one item, containing any failure
    pub async fn process(&mut self, item: WorkItem) {
        let result = match &item {
            WorkItem::Outlet(outlet) => {
                self.report.outlets += 1;
                self.process_outlet(outlet).await
            }
            WorkItem::Link(link) => {
                self.report.links += 1;
                self.process_link(link).await
            }
            WorkItem::Stop => Ok(()),
        };

        if let Err(e) = result {
            self.report.errors += 1;
            tracing::error!(
                "Worker {} failed to process {:?}: {}",
                self.report.worker_id,
                item,
                e
            );
            if let Err(e) = self.store.rollback() {
                tracing::error!("Worker {} rollback failed: {}", self.report.worker_id, e);
            }
        }
    }

    async fn process_outlet(&mut self, outlet: &OutletRecord) -> Result<()> {
        if let Some(scrape) = self.fetch_and_persist(&outlet.url).await? {
            self.store.attach_outlet_scrape(outlet.id, scrape.id)?;
            tracing::debug!("Outlet {} resolved by scrape {}", outlet.name, scrape.id);
        }
        Ok(())
    }

    async fn process_link(&mut self, link: &LinkRecord) -> Result<()> {
        if !self.context.claim(&link.url_target) {
            self.report.skipped += 1;
            tracing::debug!("Skipping {}: already claimed this round", link.url_target);
            return Ok(());
        }
        self.fetch_and_persist(&link.url_target).await?;
        Ok(())
    }

    /// Fetches `url` and persists the outcome
    ///
    /// Returns the scrape only when the fetch succeeded with HTTP 200 and
    /// the page was stored together with its links.
    pub async fn fetch_and_persist(&mut self, url: &str) -> Result<Option<ScrapeRecord>> {
        let context = Arc::clone(&self.context);

        match context.fetcher.fetch(url).await {
            FetchResult::NetworkError { error } => {
                self.report.network_errors += 1;
                tracing::warn!("Failed to fetch {}: {}", url, error);
                Ok(None)
            }

            FetchResult::HttpError {
                final_url,
                status_code,
                elapsed,
            } => {
                let resolved = normalize_url(&final_url, None)
                    .map(String::from)
                    .unwrap_or(final_url);

                self.store.begin()?;
                let scrape = self.store.insert_scrape(&NewScrape {
                    url_started: url.to_string(),
                    url_finished: Some(resolved),
                    status_code,
                    seconds_elapsed: elapsed.as_secs_f64(),
                })?;
                let incremented = record_failure(&mut self.store, &scrape.urls())?;
                self.store.commit()?;

                self.report.failed += 1;
                tracing::debug!(
                    "HTTP {} from {} ({} incoming links marked)",
                    status_code,
                    url,
                    incremented
                );
                Ok(None)
            }

            FetchResult::Success {
                final_url,
                status_code,
                elapsed,
                body,
            } => {
                let resolved = match normalize_url(&final_url, None) {
                    Ok(resolved) => resolved,
                    Err(e) => {
                        tracing::debug!("Discarding {}: resolved URL {} is unusable: {}", url, final_url, e);
                        return Ok(None);
                    }
                };

                let targets = extract_links(&body, &resolved, &context.selector);

                self.store.begin()?;
                let links = build_links(&self.store, &resolved, &targets)?;
                let scrape = self.store.insert_scrape(&NewScrape {
                    url_started: url.to_string(),
                    url_finished: Some(resolved.to_string()),
                    status_code,
                    seconds_elapsed: elapsed.as_secs_f64(),
                })?;
                for link in &links {
                    self.store.insert_link(scrape.id, link)?;
                }
                fix_up_incoming(&mut self.store, &scrape)?;
                self.store.commit()?;

                self.report.succeeded += 1;
                tracing::debug!(
                    "Scraped {} in {:.2}s: {} links",
                    url,
                    scrape.seconds_elapsed,
                    links.len()
                );
                Ok(Some(scrape))
            }
        }
    }
}

/// A fixed set of workers sharing one frontier
pub struct WorkerPool {
    frontier: Arc<Frontier>,
    handles: Vec<JoinHandle<WorkerReport>>,
}

/// Outcome of shutting a pool down
#[derive(Debug, Default)]
pub struct PoolReport {
    pub workers: Vec<WorkerReport>,
    /// Workers that panicked instead of returning a report
    pub failed_workers: usize,
    /// Items still queued after every worker ended
    pub leftover: usize,
}

impl WorkerPool {
    /// Spawns `n` workers, each with a freshly opened storage session
    ///
    /// # Arguments
    ///
    /// * `n` - Number of workers
    /// * `context` - Shared fetcher, selector and claim set
    /// * `frontier` - Queue the workers consume
    /// * `open_store` - Opens one storage session per worker
    pub fn spawn<S, F>(
        n: usize,
        context: Arc<CrawlContext>,
        frontier: Arc<Frontier>,
        open_store: F,
    ) -> Result<Self>
    where
        S: GraphStore + Send + 'static,
        F: Fn() -> Result<S>,
    {
        let mut handles = Vec::with_capacity(n);
        for id in 0..n {
            let store = match open_store() {
                Ok(store) => store,
                Err(e) => {
                    // Release the workers already waiting on the frontier
                    for _ in 0..handles.len() {
                        frontier.push(WorkItem::Stop);
                    }
                    return Err(e);
                }
            };
            let worker = Worker::new(id, store, Arc::clone(&context), Arc::clone(&frontier));
            handles.push(tokio::spawn(worker.run()));
        }

        Ok(Self { frontier, handles })
    }

    /// Number of workers in the pool
    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Stops every worker and waits for them
    ///
    /// One `Stop` per worker is queued behind all pending work, so every
    /// item pushed before this call is processed first.
    pub async fn shutdown(self) -> PoolReport {
        for _ in 0..self.handles.len() {
            self.frontier.push(WorkItem::Stop);
        }

        let mut report = PoolReport::default();
        for handle in self.handles {
            match handle.await {
                Ok(worker) => report.workers.push(worker),
                Err(e) => {
                    report.failed_workers += 1;
                    tracing::error!("Worker task failed: {}", e);
                }
            }
        }

        let leftover = self.frontier.drain();
        for item in &leftover {
            tracing::warn!("Unprocessed item after shutdown: {:?}", item);
        }
        report.leftover = leftover.len();

        report
    }
}
