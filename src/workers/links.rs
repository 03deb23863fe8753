//! Link worker
//!
//! Consumes link URLs, registers the link and its owning domain, and passes
//! crawlable links on to the prioritizer.

use crate::queue::{DOMAINS, PRIORITIZER};
use crate::robots::RobotsCache;
use crate::storage::{
    LinkRecord, NewLink, SqliteStorage, Storage, StorageResult, MAX_DOMAIN_NAME_LEN,
};
use crate::url::canonicalize;
use crate::workers::{Stage, Transition};
use crate::{SumiError, UrlError};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Registers links and checks them against robots.txt
pub struct LinkWorker {
    storage: Arc<SqliteStorage>,
    robots: Arc<RobotsCache>,
    max_url_length: usize,
}

impl LinkWorker {
    pub fn new(storage: Arc<SqliteStorage>, robots: Arc<RobotsCache>, max_url_length: usize) -> Self {
        Self {
            storage,
            robots,
            max_url_length,
        }
    }
}

#[async_trait]
impl Stage for LinkWorker {
    fn name(&self) -> &'static str {
        "link"
    }

    async fn handle(&self, body: &str) -> Result<Transition, SumiError> {
        let canonical = canonicalize(body)?;
        if canonical.url.chars().count() > self.max_url_length {
            return Err(UrlError::Malformed(format!(
                "URL longer than {} chars",
                self.max_url_length
            ))
            .into());
        }
        if canonical.host.chars().count() > MAX_DOMAIN_NAME_LEN {
            return Err(UrlError::Malformed(format!(
                "domain name longer than {} chars: {}",
                MAX_DOMAIN_NAME_LEN, canonical.host
            ))
            .into());
        }

        let policy = self.robots.policy(&canonical.host, &canonical.scheme).await;
        let allowed = policy.is_allowed(&canonical.url, self.robots.agent());

        let (link, domain_inserted, link_inserted) =
            self.storage
                .transaction(|tx| -> StorageResult<(LinkRecord, bool, bool)> {
                    let domain_inserted = match tx.find_domain_by_name(&canonical.host)? {
                        Some(_) => false,
                        None => tx.upsert_domain(&canonical.host, &canonical.scheme)?.1,
                    };

                    let (mut link, link_inserted) = match tx.find_link_by_url(&canonical.url)? {
                        Some(link) => (link, false),
                        None => tx.insert_link(&NewLink::new(canonical.url.as_str()))?,
                    };

                    if !allowed {
                        link.last_crawled_at = Some(Utc::now());
                        tx.update_link(&link)?;
                    }

                    Ok((link, domain_inserted, link_inserted))
                })?;

        let mut transition = Transition::none();
        transition.added = u64::from(link_inserted);

        if domain_inserted {
            tracing::debug!("Discovered domain {}", canonical.host);
            transition.emit(DOMAINS, format!("{}://{}", canonical.scheme, canonical.host));
        }

        if !allowed {
            tracing::info!("Disallowed by robots.txt: {}", link.url);
            return Ok(transition);
        }

        transition.emit(PRIORITIZER, link.id.to_string());
        Ok(transition)
    }
}
