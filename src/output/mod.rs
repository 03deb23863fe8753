//! Output module for reporting on the link graph
//!
//! This module handles:
//! - Loading link graph statistics from the store
//! - Printing them for the `--stats` mode
//! - Logging per-stage worker counters at shutdown

pub mod stats;

pub use stats::{load_statistics, log_worker_statistics, print_statistics, CrawlStatistics};
