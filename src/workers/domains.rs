//! Domain worker
//!
//! Consumes `scheme://host` URLs, registers the domain and applies its
//! robots.txt policy.

use crate::queue::{LINKS, SITEMAPS};
use crate::robots::RobotsCache;
use crate::storage::{DomainRecord, SqliteStorage, Storage, StorageResult, MAX_DOMAIN_NAME_LEN};
use crate::url::extract_domain;
use crate::workers::{Stage, Transition};
use crate::{SumiError, UrlError};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use url::Url;

/// Registers domains and reads their robots.txt
pub struct DomainWorker {
    storage: Arc<SqliteStorage>,
    robots: Arc<RobotsCache>,
}

impl DomainWorker {
    pub fn new(storage: Arc<SqliteStorage>, robots: Arc<RobotsCache>) -> Self {
        Self { storage, robots }
    }
}

#[async_trait]
impl Stage for DomainWorker {
    fn name(&self) -> &'static str {
        "domain"
    }

    async fn handle(&self, body: &str) -> Result<Transition, SumiError> {
        let url = Url::parse(body.trim())?;
        let scheme = url.scheme().to_string();
        if scheme != "http" && scheme != "https" {
            return Err(UrlError::InvalidScheme(scheme).into());
        }

        let name = extract_domain(&url).ok_or(UrlError::MissingDomain)?;
        if name.chars().count() > MAX_DOMAIN_NAME_LEN {
            return Err(UrlError::Malformed(format!(
                "domain name longer than {} chars: {}",
                MAX_DOMAIN_NAME_LEN, name
            ))
            .into());
        }

        // An existing row keeps the protocol it was first seen with
        let protocol = self
            .storage
            .read(|conn| conn.find_domain_by_name(&name))?
            .map(|domain| domain.protocol)
            .unwrap_or_else(|| scheme.clone());

        let policy = self.robots.policy(&name, &protocol).await;
        let root = format!("{}://{}/", protocol, name);
        let allowed = policy.is_allowed(&root, self.robots.agent());

        let (domain, inserted) =
            self.storage
                .transaction(|tx| -> StorageResult<(DomainRecord, bool)> {
                    let (mut domain, inserted) = tx.upsert_domain(&name, &scheme)?;
                    domain.last_processed_at = Some(Utc::now());
                    domain.crawl_delay = policy.crawl_delay();
                    domain.has_robots_txt = Some(policy.has_robots_txt());
                    domain.is_blocked = Some(!allowed);
                    tx.update_domain(&domain)?;
                    Ok((domain, inserted))
                })?;

        tracing::info!(
            "Processed domain {} (robots.txt: {}, delay: {}s, blocked: {})",
            domain.name,
            policy.has_robots_txt(),
            domain.crawl_delay,
            !allowed
        );

        let mut transition = Transition::none();
        transition.added = u64::from(inserted);
        transition.emit(LINKS, format!("{}://{}", domain.protocol, domain.name));

        if policy.has_robots_txt() {
            for sitemap in policy.sitemaps() {
                transition.emit(SITEMAPS, sitemap.as_str());
            }
        }

        Ok(transition)
    }
}
