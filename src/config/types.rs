use serde::Deserialize;

/// Main configuration structure for Sumi-Lattice
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,

    pub database: DatabaseConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub crawl: CrawlConfig,

    #[serde(default)]
    pub workers: WorkersConfig,

    /// Domain URLs (`scheme://host`) published to the domains queue at startup
    #[serde(default)]
    pub seeds: Vec<String>,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler, also used as the robots.txt product token
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Link graph store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file (`:memory:` for a throwaway store)
    pub path: String,
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Transport-level retries on timeouts and connection failures
    pub retries: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            retries: 2,
        }
    }
}

/// Crawl politeness and size limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Delay applied when robots.txt is missing or gives no usable value (seconds)
    pub default_crawl_delay: u32,

    /// Upper bound for robots.txt crawl delays (seconds)
    pub max_crawl_delay: u32,

    /// Maximum characters of semantic content kept per page
    pub max_content_chars: usize,

    /// Links longer than this are never stored
    pub max_url_length: usize,

    /// Number of (host, scheme) robots policies kept in memory
    pub robots_cache_capacity: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            default_crawl_delay: 5,
            max_crawl_delay: 10,
            max_content_chars: 100_000,
            max_url_length: 512,
            robots_cache_capacity: 1000,
        }
    }
}

/// Replica counts for every pipeline stage
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WorkersConfig {
    pub domains: usize,
    pub sitemaps: usize,
    pub links: usize,
    pub prioritizers: usize,

    /// Routers per priority queue
    pub routers: usize,

    /// Number of `links_pool_{i}` queues the routers spread work over
    pub selector_pools: usize,

    pub selectors_per_pool: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            domains: 1,
            sitemaps: 1,
            links: 1,
            prioritizers: 1,
            routers: 1,
            selector_pools: 5,
            selectors_per_pool: 1,
        }
    }
}
