//! Statistics generation from the link graph
//!
//! This module provides functionality for extracting and displaying
//! link graph statistics and per-stage worker counters.

use crate::state::ChangeFreq;
use crate::storage::{SqliteStorage, Storage};
use crate::workers::StatsSnapshot;
use crate::SumiError;
use std::collections::HashMap;

/// Link graph statistics summary
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlStatistics {
    /// Number of registered domains
    pub total_domains: u64,

    /// Number of registered links
    pub total_links: u64,

    /// Links that have been crawled (or refused by robots.txt)
    pub crawled_links: u64,

    /// Number of link -> link edges
    pub total_relations: u64,

    /// Count of links by change frequency
    pub links_by_change_freq: HashMap<ChangeFreq, u64>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The link graph store to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(SumiError)` - Failed to query statistics
pub fn load_statistics(storage: &SqliteStorage) -> Result<CrawlStatistics, SumiError> {
    storage.read(|conn| {
        Ok(CrawlStatistics {
            total_domains: conn.count_domains()?,
            total_links: conn.count_links()?,
            crawled_links: conn.count_crawled_links()?,
            total_relations: conn.count_relations()?,
            links_by_change_freq: conn.count_links_by_change_freq()?,
        })
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Link Graph Statistics ===\n");

    println!("Overview:");
    println!("  Domains: {}", stats.total_domains);
    println!("  Links: {}", stats.total_links);
    println!("  Crawled links: {}", stats.crawled_links);
    println!("  Relations: {}", stats.total_relations);
    println!();

    println!("Links by Change Frequency:");
    for freq in ChangeFreq::ALL {
        let count = stats.links_by_change_freq.get(&freq).copied().unwrap_or(0);
        if count == 0 {
            continue;
        }
        let percentage = if stats.total_links > 0 {
            (count as f64 / stats.total_links as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", freq, count, percentage);
    }
    println!();

    let crawl_rate = if stats.total_links > 0 {
        (stats.crawled_links as f64 / stats.total_links as f64) * 100.0
    } else {
        0.0
    };

    println!(
        "Crawl Coverage: {:.1}% ({} / {} links crawled)",
        crawl_rate, stats.crawled_links, stats.total_links
    );
}

/// Logs the per-stage worker counters
pub fn log_worker_statistics(stats: &[(&'static str, StatsSnapshot)]) {
    for (stage, snapshot) in stats {
        tracing::info!(
            "{:>12}: {} processed, {} added, {} dropped",
            stage,
            snapshot.processed,
            snapshot.added,
            snapshot.dropped
        );
    }
}
