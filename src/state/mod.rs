//! State module for crawl policy values
//!
//! # Components
//!
//! - `ChangeFreq`: How often a link is expected to change
//! - `PriorityLevel`: The priority band a link is routed through
//! - Politeness helpers deriving crawl delays and wait windows per domain

mod change_freq;
mod domain_state;
mod priority;

pub use change_freq::ChangeFreq;
pub use domain_state::{resolve_crawl_delay, time_until_next_crawl, MAX_CRAWL_DELAY};
pub use priority::{normalize_priority, PriorityLevel, DEFAULT_PRIORITY};
