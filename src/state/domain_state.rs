//! Per-domain politeness rules
//!
//! A domain is crawled at most once per crawl-delay window. The delay comes
//! from the domain's robots.txt, bounded by the configured limits.

use crate::config::CrawlConfig;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Hard upper bound on any crawl delay, in seconds
pub const MAX_CRAWL_DELAY: u32 = 10;

/// Derives a domain's crawl delay from a robots.txt `Crawl-delay` value
///
/// Fractional values are truncated to whole seconds. Values above the
/// configured maximum are capped; negative or missing values fall back to
/// the default.
///
/// # Arguments
///
/// * `raw` - The `Crawl-delay` value from robots.txt, if any
/// * `config` - Crawl limits holding the default and maximum delay
///
/// # Returns
///
/// The delay in seconds, never above `max_crawl_delay` or [`MAX_CRAWL_DELAY`]
pub fn resolve_crawl_delay(raw: Option<f64>, config: &CrawlConfig) -> u32 {
    let max = config.max_crawl_delay.min(MAX_CRAWL_DELAY);
    let default = config.default_crawl_delay.min(max);

    let Some(raw) = raw.filter(|v| v.is_finite()) else {
        return default;
    };

    let seconds = raw.trunc();
    if seconds > max as f64 {
        max
    } else if seconds < 0.0 {
        default
    } else {
        seconds as u32
    }
}

/// Calculates how long to wait before a domain may be crawled again
///
/// Elapsed time is counted in whole seconds, so a crawl 2.7s ago with a
/// delay of 5 waits 3s.
///
/// # Arguments
///
/// * `last_crawled_at` - When the domain was last crawled, if ever
/// * `crawl_delay` - The domain's crawl delay in seconds
/// * `now` - The current time
///
/// # Returns
///
/// `None` if a crawl may start now, or the duration to wait otherwise
pub fn time_until_next_crawl(
    last_crawled_at: Option<DateTime<Utc>>,
    crawl_delay: u32,
    now: DateTime<Utc>,
) -> Option<Duration> {
    let last = last_crawled_at?;
    let elapsed = (now - last).num_seconds().max(0);
    let delay = i64::from(crawl_delay);

    if elapsed < delay {
        Some(Duration::from_secs((delay - elapsed) as u64))
    } else {
        None
    }
}
