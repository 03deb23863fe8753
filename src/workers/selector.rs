//! Selector (crawl) worker
//!
//! Consumes link IDs from one selector pool. For each link it waits out the
//! domain's crawl delay, fetches the page, stores its content and metadata,
//! and records an edge to every link the page references. Links seen for the
//! first time go back onto the link queue.

use crate::crawler::{extract, ExtractedPage, HttpClient};
use crate::queue::LINKS;
use crate::state::time_until_next_crawl;
use crate::storage::{
    clip, DomainRecord, LinkRecord, NewLink, SqliteStorage, Storage, MAX_CONTENT_TYPE_LEN,
    MAX_DESCRIPTION_LEN, MAX_KEYWORDS_LEN, MAX_LANG_LEN, MAX_TITLE_LEN,
};
use crate::url::{canonicalize, resolve_href};
use crate::workers::prioritizer::parse_link_id;
use crate::workers::{Stage, Transition};
use crate::SumiError;
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use std::sync::{Arc, OnceLock};

const URL_PATTERN: &str = r"^https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)";

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(URL_PATTERN).expect("valid URL pattern"))
}

/// Crawls pages and grows the link graph
pub struct Selector {
    storage: Arc<SqliteStorage>,
    client: HttpClient,
    max_content_chars: usize,
    max_url_length: usize,
}

impl Selector {
    pub fn new(
        storage: Arc<SqliteStorage>,
        client: HttpClient,
        max_content_chars: usize,
        max_url_length: usize,
    ) -> Self {
        Self {
            storage,
            client,
            max_content_chars,
            max_url_length,
        }
    }

    /// Collects the canonical targets of every href on a page
    ///
    /// Relative hrefs are resolved against the domain that served the page.
    /// Targets that do not look like web URLs or exceed the URL length limit
    /// are skipped.
    fn collect_targets(&self, page: &ExtractedPage, domain: &DomainRecord) -> Vec<String> {
        let resolved = page
            .unsafe_hrefs
            .iter()
            .filter_map(|href| resolve_href(href, &domain.protocol, &domain.name))
            .filter_map(|url| canonicalize(&url).ok().map(|c| c.url));

        let mut targets: Vec<String> = Vec::new();
        for href in page.safe_links.iter().cloned().chain(resolved) {
            if !url_regex().is_match(&href) {
                tracing::warn!("href did not match URL pattern: {}", href);
                continue;
            }
            if href.chars().count() > self.max_url_length {
                continue;
            }
            if !targets.contains(&href) {
                targets.push(href);
            }
        }
        targets
    }
}

#[async_trait]
impl Stage for Selector {
    fn name(&self) -> &'static str {
        "selector"
    }

    async fn handle(&self, body: &str) -> Result<Transition, SumiError> {
        let id = parse_link_id(body)?;

        let (link, domain) = self
            .storage
            .transaction(|tx| -> Result<(LinkRecord, DomainRecord), SumiError> {
                let link = tx.get_link(id)?.ok_or(SumiError::LinkNotFound(id))?;
                let host = canonicalize(&link.url)?.host;
                let domain = tx
                    .find_domain_by_name(&host)?
                    .ok_or(SumiError::DomainNotFound(host))?;
                Ok((link, domain))
            })?;

        if let Some(wait) =
            time_until_next_crawl(domain.last_crawled_at, domain.crawl_delay, Utc::now())
        {
            tracing::debug!("Waiting {:?} before crawling {}", wait, domain.name);
            tokio::time::sleep(wait).await;
        }

        let response = self.client.fetch(&link.url).await?;
        let status = response.status;

        let page = if status < 400 && response.is_html() {
            Some(extract(&response.body, self.max_content_chars))
        } else {
            None
        };
        let targets = page
            .as_ref()
            .map(|page| self.collect_targets(page, &domain))
            .unwrap_or_default();

        let discovered = self
            .storage
            .transaction(|tx| -> Result<Vec<String>, SumiError> {
                let now = Utc::now();

                let mut domain = tx
                    .get_domain(domain.id)?
                    .ok_or_else(|| SumiError::DomainNotFound(domain.name.clone()))?;
                domain.last_crawled_at = Some(now);
                tx.update_domain(&domain)?;

                let mut link = tx.get_link(id)?.ok_or(SumiError::LinkNotFound(id))?;
                link.last_crawled_at = Some(now);
                link.http_status = Some(status);

                if status >= 400 {
                    tx.update_link(&link)?;
                    return Ok(Vec::new());
                }

                link.content_type = response
                    .content_type
                    .as_deref()
                    .map(|ct| clip(ct, MAX_CONTENT_TYPE_LEN));

                let Some(page) = page else {
                    tx.update_link(&link)?;
                    return Ok(Vec::new());
                };

                if page.content.is_some() {
                    link.content = page.content;
                }
                link.title = page.title.as_deref().map(|v| clip(v, MAX_TITLE_LEN));
                link.description = page
                    .description
                    .as_deref()
                    .map(|v| clip(v, MAX_DESCRIPTION_LEN));
                link.keywords = page.keywords.as_deref().map(|v| clip(v, MAX_KEYWORDS_LEN));
                link.lang = page.lang.as_deref().map(|v| clip(v, MAX_LANG_LEN));
                tx.update_link(&link)?;

                let mut discovered = Vec::new();
                for target in &targets {
                    let target_link = match tx.find_link_by_url(target)? {
                        Some(existing) => existing,
                        None => {
                            let (created, inserted) = tx.insert_link(&NewLink::new(target.as_str()))?;
                            if inserted {
                                discovered.push(created.url.clone());
                            }
                            created
                        }
                    };

                    if tx.find_relation(link.id, target_link.id)?.is_none() {
                        tx.insert_relation(link.id, target_link.id)?;
                    }
                }

                Ok(discovered)
            })?;

        tracing::info!(
            "Crawled {} (HTTP {}, {} links, {} new)",
            link.url,
            status,
            targets.len(),
            discovered.len()
        );

        let mut transition = Transition::none();
        transition.added = discovered.len() as u64;
        for url in discovered {
            transition.emit(LINKS, url);
        }
        Ok(transition)
    }
}
