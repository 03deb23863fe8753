//! Robots.txt caching implementation
//!
//! Policies are kept per (host, scheme) for the lifetime of the process in a
//! bounded cache. Lookups do not refresh an entry, so once the cache is full
//! the oldest fetched policy is evicted first.

use crate::config::CrawlConfig;
use crate::crawler::HttpClient;
use crate::robots::{fetch_robots, RobotsPolicy};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

type PolicyKey = (String, String);

/// Bounded, shared robots.txt policy cache
pub struct RobotsCache {
    client: HttpClient,
    agent: String,
    config: CrawlConfig,
    entries: Mutex<LruCache<PolicyKey, Arc<RobotsPolicy>>>,
}

impl RobotsCache {
    /// Creates an empty cache
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used to fetch robots.txt
    /// * `agent` - The crawler's robots.txt product token
    /// * `config` - Crawl delay bounds and cache capacity
    pub fn new(client: HttpClient, agent: impl Into<String>, config: CrawlConfig) -> Self {
        let capacity = NonZeroUsize::new(config.robots_cache_capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            client,
            agent: agent.into(),
            config,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// The product token allow checks are made for
    pub fn agent(&self) -> &str {
        &self.agent
    }

    /// Returns the policy for a host, fetching robots.txt on a miss
    ///
    /// Two workers missing on the same host at once may both fetch; the
    /// later result replaces the earlier one.
    pub async fn policy(&self, host: &str, scheme: &str) -> Arc<RobotsPolicy> {
        let key = (host.to_string(), scheme.to_string());

        if let Some(policy) = self.cached(&key) {
            return policy;
        }

        let robots = fetch_robots(&self.client, host, scheme).await;
        let policy = Arc::new(match robots {
            Some(robots) => RobotsPolicy::new(Some(robots), &self.agent, &self.config),
            None => RobotsPolicy::missing(&self.config),
        });

        tracing::debug!(
            "Cached robots policy for {}://{} (robots.txt: {}, delay: {}s)",
            scheme,
            host,
            policy.has_robots_txt(),
            policy.crawl_delay()
        );

        if let Ok(mut entries) = self.entries.lock() {
            entries.put(key, Arc::clone(&policy));
        }

        policy
    }

    /// Number of cached policies
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cached(&self, key: &PolicyKey) -> Option<Arc<RobotsPolicy>> {
        let entries = self.entries.lock().ok()?;
        entries.peek(key).map(Arc::clone)
    }
}
