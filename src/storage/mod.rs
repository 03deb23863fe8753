//! Storage module for the link graph
//!
//! This module handles all database operations for the pipeline, including:
//! - SQLite database initialization and schema management
//! - Domain and link registration with uniqueness guarantees
//! - Directed link relations (edges) between links
//! - Counters used for statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::{ChangeFreq, DEFAULT_PRIORITY};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Column width of `links.url`
pub const MAX_URL_LEN: usize = 512;
/// Column width of `domains.name`
pub const MAX_DOMAIN_NAME_LEN: usize = 50;
/// Column width of `domains.protocol`
pub const MAX_PROTOCOL_LEN: usize = 10;
/// Column width of `links.title`
pub const MAX_TITLE_LEN: usize = 100;
/// Column width of `links.description`
pub const MAX_DESCRIPTION_LEN: usize = 250;
/// Column width of `links.keywords`
pub const MAX_KEYWORDS_LEN: usize = 100;
/// Column width of `links.lang`
pub const MAX_LANG_LEN: usize = 3;
/// Column width of `links.content_type`
pub const MAX_CONTENT_TYPE_LEN: usize = 30;

/// Represents a domain in the database
#[derive(Debug, Clone, PartialEq)]
pub struct DomainRecord {
    pub id: Uuid,
    pub name: String,
    pub protocol: String,
    pub crawl_delay: u32,
    /// `None` until robots.txt has been looked up
    pub has_robots_txt: Option<bool>,
    /// `None` until robots.txt has been looked up
    pub is_blocked: Option<bool>,
    pub last_crawled_at: Option<DateTime<Utc>>,
    pub last_processed_at: Option<DateTime<Utc>>,
    pub first_discovered_at: DateTime<Utc>,
}

/// Represents a link in the database
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRecord {
    pub id: Uuid,
    pub url: String,
    pub change_freq: ChangeFreq,
    pub priority: f64,
    pub lang: Option<String>,
    pub content: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub http_status: Option<u16>,
    pub content_type: Option<String>,
    pub keywords: Option<String>,
    pub last_crawled_at: Option<DateTime<Utc>>,
    pub first_discovered_at: DateTime<Utc>,
}

/// A link about to be registered
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub url: String,
    pub change_freq: ChangeFreq,
    pub priority: f64,
}

impl NewLink {
    /// A link with default change frequency and priority
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            change_freq: ChangeFreq::default(),
            priority: DEFAULT_PRIORITY,
        }
    }

    /// A link carrying sitemap hints
    pub fn with_hints(url: impl Into<String>, change_freq: ChangeFreq, priority: f64) -> Self {
        Self {
            url: url.into(),
            change_freq,
            priority,
        }
    }
}

/// A directed edge: the page at `link_id` references `has_link_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkRelationRecord {
    pub link_id: Uuid,
    pub has_link_id: Uuid,
}

/// Clips a value to a column width, on a char boundary
pub fn clip(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
