//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching robots.txt files.
//! A [`RobotsPolicy`] answers the three questions the pipeline asks about a host:
//! may a URL be crawled, how long to wait between crawls, and which sitemaps
//! are declared.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::ParsedRobots;

use crate::config::CrawlConfig;
use crate::crawler::HttpClient;
use crate::state::resolve_crawl_delay;

/// Effective robots.txt policy for one (host, scheme)
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    robots: Option<ParsedRobots>,
    crawl_delay: u32,
    sitemaps: Vec<String>,
}

impl RobotsPolicy {
    /// Derives the policy from a robots.txt file, if one was found
    ///
    /// # Arguments
    ///
    /// * `robots` - The parsed file, or `None` when the host has none
    /// * `agent` - The crawler's robots.txt product token
    /// * `config` - Crawl delay bounds
    pub fn new(robots: Option<ParsedRobots>, agent: &str, config: &CrawlConfig) -> Self {
        let raw_delay = robots.as_ref().and_then(|r| r.crawl_delay(agent));
        let sitemaps = robots.as_ref().map(|r| r.sitemaps()).unwrap_or_default();

        Self {
            crawl_delay: resolve_crawl_delay(raw_delay, config),
            robots,
            sitemaps,
        }
    }

    /// The policy of a host without robots.txt
    pub fn missing(config: &CrawlConfig) -> Self {
        Self {
            robots: None,
            crawl_delay: resolve_crawl_delay(None, config),
            sitemaps: Vec::new(),
        }
    }

    /// Whether the host served a robots.txt file
    pub fn has_robots_txt(&self) -> bool {
        self.robots.is_some()
    }

    /// Checks if a URL may be crawled by `agent`
    pub fn is_allowed(&self, url: &str, agent: &str) -> bool {
        match &self.robots {
            Some(robots) => robots.is_allowed(url, agent),
            None => true,
        }
    }

    /// The crawl delay in whole seconds
    pub fn crawl_delay(&self) -> u32 {
        self.crawl_delay
    }

    /// Declared sitemap URLs
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }
}

/// Fetches robots.txt for a host
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `host` - The host (with port, if any) to fetch robots.txt from
/// * `scheme` - `http` or `https`
///
/// # Returns
///
/// * `Some(ParsedRobots)` - The host answered 200
/// * `None` - Any other status or a transport failure
pub async fn fetch_robots(client: &HttpClient, host: &str, scheme: &str) -> Option<ParsedRobots> {
    let url = format!("{}://{}/robots.txt", scheme, host);

    match client.fetch(&url).await {
        Ok(response) if response.status == 200 => {
            Some(ParsedRobots::from_content(&response.body))
        }
        Ok(response) => {
            tracing::debug!("No robots.txt at {} (HTTP {})", url, response.status);
            None
        }
        Err(e) => {
            tracing::debug!("Failed to fetch {}: {}", url, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_policy_allows_everything() {
        let config = CrawlConfig::default();
        let policy = RobotsPolicy::missing(&config);

        assert!(!policy.has_robots_txt());
        assert!(policy.is_allowed("https://www.example.com/admin", "TestBot"));
        assert_eq!(policy.crawl_delay(), 5);
        assert!(policy.sitemaps().is_empty());
    }

    #[test]
    fn test_policy_clamps_delay() {
        let config = CrawlConfig::default();

        let robots = ParsedRobots::from_content("User-agent: *\nCrawl-delay: 15");
        let policy = RobotsPolicy::new(Some(robots), "TestBot", &config);
        assert!(policy.has_robots_txt());
        assert_eq!(policy.crawl_delay(), 10);

        let robots = ParsedRobots::from_content("User-agent: *\nCrawl-delay: -3");
        let policy = RobotsPolicy::new(Some(robots), "TestBot", &config);
        assert_eq!(policy.crawl_delay(), 5);

        let robots = ParsedRobots::from_content("User-agent: *\nDisallow:");
        let policy = RobotsPolicy::new(Some(robots), "TestBot", &config);
        assert_eq!(policy.crawl_delay(), 5);
    }

    #[test]
    fn test_policy_sitemaps_and_rules() {
        let config = CrawlConfig::default();
        let robots = ParsedRobots::from_content(
            "User-agent: *\nDisallow: /private\nSitemap: https://www.example.com/sitemap.xml",
        );
        let policy = RobotsPolicy::new(Some(robots), "TestBot", &config);

        assert_eq!(policy.sitemaps(), ["https://www.example.com/sitemap.xml"]);
        assert!(policy.is_allowed("https://www.example.com/", "TestBot"));
        assert!(!policy.is_allowed("https://www.example.com/private/x", "TestBot"));
    }
}
