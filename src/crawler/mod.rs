//! Crawler module for fetching and processing web content
//!
//! This module contains the pieces the pipeline stages are built from:
//! - HTTP fetching with retry logic
//! - HTML content and link extraction
//! - Sitemap expansion
//! - Overall pipeline coordination

mod coordinator;
mod extractor;
mod fetcher;
mod sitemap;

pub use coordinator::{open_storage, run_pipeline, Coordinator};
pub use extractor::{extract, truncate_content, ExtractedPage, TRUNCATION_MARKER};
pub use fetcher::{build_http_client, user_agent_string, FetchResponse, HttpClient};
pub use sitemap::{expand_sitemap, SitemapContents, SitemapEntry};
