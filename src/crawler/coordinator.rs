//! Pipeline coordinator - wires the stages together
//!
//! This module builds every shared resource the stages need and runs them:
//! - Opening the link graph store
//! - Building the HTTP client and the robots.txt cache
//! - Declaring the queues and publishing seeds
//! - Spawning one worker pool per stage (and per selector pool)
//! - Collecting per-stage statistics

use crate::config::Config;
use crate::crawler::HttpClient;
use crate::queue::{self, InMemoryBroker, MessageBus};
use crate::robots::RobotsCache;
use crate::state::PriorityLevel;
use crate::storage::SqliteStorage;
use crate::workers::{
    spawn_pool, DomainWorker, LinkWorker, Prioritizer, Router, Selector, SitemapWorker,
    StatsSnapshot, WorkerStats,
};
use crate::SumiError;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const STAGES: [&str; 6] = ["domain", "sitemap", "link", "prioritizer", "router", "selector"];

/// Main pipeline coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    storage: Arc<SqliteStorage>,
    bus: Arc<dyn MessageBus>,
    client: HttpClient,
    robots: Arc<RobotsCache>,
    stats: Vec<(&'static str, Arc<WorkerStats>)>,
}

impl Coordinator {
    /// Creates a coordinator with the configured database and an in-process broker
    ///
    /// # Arguments
    ///
    /// * `config` - The pipeline configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(SumiError)` - Failed to open the database or build the HTTP client
    pub fn new(config: Config) -> Result<Self, SumiError> {
        let storage = open_storage(&config.database.path)?;
        Self::with_parts(config, Arc::new(storage), Arc::new(InMemoryBroker::new()))
    }

    /// Creates a coordinator around an existing store and message bus
    pub fn with_parts(
        config: Config,
        storage: Arc<SqliteStorage>,
        bus: Arc<dyn MessageBus>,
    ) -> Result<Self, SumiError> {
        let client = HttpClient::new(&config.user_agent, &config.http)?;
        let robots = Arc::new(RobotsCache::new(
            client.clone(),
            config.user_agent.crawler_name.clone(),
            config.crawl.clone(),
        ));
        let stats = STAGES
            .iter()
            .map(|name| (*name, Arc::new(WorkerStats::new())))
            .collect();

        Ok(Self {
            config: Arc::new(config),
            storage,
            bus,
            client,
            robots,
            stats,
        })
    }

    pub fn storage(&self) -> &Arc<SqliteStorage> {
        &self.storage
    }

    pub fn bus(&self) -> &Arc<dyn MessageBus> {
        &self.bus
    }

    /// Every queue the pipeline consumes or publishes to
    pub fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = [queue::DOMAINS, queue::SITEMAPS, queue::LINKS, queue::PRIORITIZER]
            .iter()
            .map(|q| q.to_string())
            .collect();
        names.extend(PriorityLevel::ALL.iter().map(|l| l.queue_name().to_string()));
        names.extend((1..=self.config.workers.selector_pools).map(queue::pool_queue));
        names
    }

    pub async fn declare_queues(&self) -> Result<(), SumiError> {
        for name in self.queue_names() {
            self.bus.declare(&name).await?;
        }
        Ok(())
    }

    /// Publishes domain URLs to the domains queue
    ///
    /// # Returns
    ///
    /// The number of seeds published
    pub async fn seed(&self, urls: &[String]) -> Result<usize, SumiError> {
        for url in urls {
            tracing::info!("Seeding {}", url);
            self.bus.publish(queue::DOMAINS, url.clone()).await?;
        }
        Ok(urls.len())
    }

    /// Spawns every worker pool
    ///
    /// The pools run until `token` is cancelled.
    pub fn start(&self, token: &CancellationToken) -> Vec<JoinHandle<()>> {
        let workers = &self.config.workers;
        let crawl = &self.config.crawl;
        let mut handles = Vec::new();

        handles.extend(spawn_pool(
            Arc::new(DomainWorker::new(
                Arc::clone(&self.storage),
                Arc::clone(&self.robots),
            )),
            queue::DOMAINS.to_string(),
            workers.domains,
            Arc::clone(&self.bus),
            token.clone(),
            self.stats_for("domain"),
        ));

        handles.extend(spawn_pool(
            Arc::new(SitemapWorker::new(
                Arc::clone(&self.storage),
                self.client.clone(),
                crawl.max_url_length,
            )),
            queue::SITEMAPS.to_string(),
            workers.sitemaps,
            Arc::clone(&self.bus),
            token.clone(),
            self.stats_for("sitemap"),
        ));

        handles.extend(spawn_pool(
            Arc::new(LinkWorker::new(
                Arc::clone(&self.storage),
                Arc::clone(&self.robots),
                crawl.max_url_length,
            )),
            queue::LINKS.to_string(),
            workers.links,
            Arc::clone(&self.bus),
            token.clone(),
            self.stats_for("link"),
        ));

        handles.extend(spawn_pool(
            Arc::new(Prioritizer::new(Arc::clone(&self.storage))),
            queue::PRIORITIZER.to_string(),
            workers.prioritizers,
            Arc::clone(&self.bus),
            token.clone(),
            self.stats_for("prioritizer"),
        ));

        let router = Arc::new(Router::new(
            Arc::clone(&self.storage),
            workers.selector_pools,
        ));
        for level in PriorityLevel::ALL {
            handles.extend(spawn_pool(
                Arc::clone(&router),
                level.queue_name().to_string(),
                workers.routers,
                Arc::clone(&self.bus),
                token.clone(),
                self.stats_for("router"),
            ));
        }

        let selector = Arc::new(Selector::new(
            Arc::clone(&self.storage),
            self.client.clone(),
            crawl.max_content_chars,
            crawl.max_url_length,
        ));
        for index in 1..=workers.selector_pools {
            handles.extend(spawn_pool(
                Arc::clone(&selector),
                queue::pool_queue(index),
                workers.selectors_per_pool,
                Arc::clone(&self.bus),
                token.clone(),
                self.stats_for("selector"),
            ));
        }

        tracing::info!("Started {} workers", handles.len());
        handles
    }

    /// Per-stage counters, in pipeline order
    pub fn stats(&self) -> Vec<(&'static str, StatsSnapshot)> {
        self.stats
            .iter()
            .map(|(name, stats)| (*name, stats.snapshot()))
            .collect()
    }

    fn stats_for(&self, stage: &str) -> Arc<WorkerStats> {
        self.stats
            .iter()
            .find(|(name, _)| *name == stage)
            .map(|(_, stats)| Arc::clone(stats))
            .unwrap_or_default()
    }
}

/// Opens the configured link graph store
///
/// `:memory:` gives a throwaway in-memory store.
pub fn open_storage(path: &str) -> Result<SqliteStorage, SumiError> {
    if path == ":memory:" {
        SqliteStorage::new_in_memory()
    } else {
        SqliteStorage::new(Path::new(path))
    }
}

/// Runs the whole pipeline until `token` is cancelled
///
/// # Arguments
///
/// * `config` - The pipeline configuration
/// * `extra_seeds` - Domain URLs published in addition to the configured seeds
/// * `token` - Cancelling it shuts the pipeline down
///
/// # Returns
///
/// * `Ok(stats)` - Per-stage counters at shutdown
/// * `Err(SumiError)` - The pipeline could not be started
///
/// # Example
///
/// ```no_run
/// use sumi_lattice::config::load_config;
/// use sumi_lattice::crawler::run_pipeline;
/// use std::path::Path;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let token = CancellationToken::new();
/// run_pipeline(config, &[], token).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_pipeline(
    config: Config,
    extra_seeds: &[String],
    token: CancellationToken,
) -> Result<Vec<(&'static str, StatsSnapshot)>, SumiError> {
    let seeds: Vec<String> = config
        .seeds
        .iter()
        .chain(extra_seeds.iter())
        .cloned()
        .collect();

    let coordinator = Coordinator::new(config)?;
    coordinator.declare_queues().await?;
    coordinator.seed(&seeds).await?;

    let handles = coordinator.start(&token);
    token.cancelled().await;

    tracing::info!("Shutting down {} workers", handles.len());
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::warn!("Worker task failed: {}", e);
        }
    }

    Ok(coordinator.stats())
}
