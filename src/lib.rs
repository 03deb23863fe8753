//! Sumi-Lattice: a distributed, polite link-graph crawler
//!
//! This crate implements a multi-stage crawl pipeline. Domains are discovered,
//! their robots.txt and sitemaps are expanded, links are prioritized and routed
//! to selector pools, and every crawled page feeds new links and graph edges
//! back into the pipeline. Stages communicate over named message queues and
//! persist into a shared link graph store.

pub mod config;
pub mod crawler;
pub mod output;
pub mod queue;
pub mod robots;
pub mod state;
pub mod storage;
pub mod url;
pub mod workers;

use thiserror::Error;
use uuid::Uuid;

/// Main error type for Sumi-Lattice operations
#[derive(Debug, Error)]
pub enum SumiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid identifier '{0}'")]
    InvalidId(String),

    #[error("Link not found: {0}")]
    LinkNotFound(Uuid),

    #[error("Domain not found: {0}")]
    DomainNotFound(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Sumi-Lattice operations
pub type Result<T> = std::result::Result<T, SumiError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use state::{ChangeFreq, PriorityLevel};
pub use url::{canonicalize, CanonicalUrl};
