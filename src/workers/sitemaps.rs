//! Sitemap worker
//!
//! Consumes sitemap URLs. Nested sitemaps go back onto the sitemap queue;
//! listed pages are registered with their hints and passed to the link queue.

use crate::crawler::{expand_sitemap, HttpClient, SitemapEntry};
use crate::queue::{LINKS, SITEMAPS};
use crate::storage::{NewLink, SqliteStorage, Storage, StorageResult};
use crate::url::canonicalize;
use crate::workers::{Stage, Transition};
use crate::SumiError;
use async_trait::async_trait;
use std::sync::Arc;

pub struct SitemapWorker {
    storage: Arc<SqliteStorage>,
    client: HttpClient,
    max_url_length: usize,
}

impl SitemapWorker {
    pub fn new(storage: Arc<SqliteStorage>, client: HttpClient, max_url_length: usize) -> Self {
        Self {
            storage,
            client,
            max_url_length,
        }
    }

    /// Canonicalizes an entry, skipping over-long and unusable URLs
    fn candidate(&self, entry: &SitemapEntry) -> Option<NewLink> {
        if entry.url.chars().count() > self.max_url_length {
            tracing::debug!("Skipping over-long sitemap entry {}", entry.url);
            return None;
        }

        match canonicalize(&entry.url) {
            Ok(canonical) if canonical.url.chars().count() <= self.max_url_length => Some(
                NewLink::with_hints(canonical.url, entry.change_freq, entry.priority),
            ),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Skipping sitemap entry {}: {}", entry.url, e);
                None
            }
        }
    }
}

#[async_trait]
impl Stage for SitemapWorker {
    fn name(&self) -> &'static str {
        "sitemap"
    }

    async fn handle(&self, body: &str) -> Result<Transition, SumiError> {
        let url = body.trim();
        let response = self.client.fetch(url).await?;

        if response.status >= 400 {
            tracing::warn!("Skipping sitemap {} (HTTP {})", url, response.status);
            return Ok(Transition::none());
        }

        let contents = expand_sitemap(&response.body);
        let candidates: Vec<NewLink> = contents
            .links
            .iter()
            .filter_map(|entry| self.candidate(entry))
            .collect();

        let added = self.storage.transaction(|tx| -> StorageResult<u64> {
            let mut added = 0;
            for candidate in &candidates {
                if tx.find_link_by_url(&candidate.url)?.is_none() && tx.insert_link(candidate)?.1 {
                    added += 1;
                }
            }
            Ok(added)
        })?;

        tracing::info!(
            "Expanded sitemap {} ({} nested, {} links, {} new)",
            url,
            contents.indexes.len(),
            candidates.len(),
            added
        );

        let mut transition = Transition::none();
        transition.added = added;
        for index in contents.indexes {
            transition.emit(SITEMAPS, index);
        }
        for candidate in candidates {
            transition.emit(LINKS, candidate.url);
        }

        Ok(transition)
    }
}
