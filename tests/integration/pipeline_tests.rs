//! Integration tests for the full pipeline
//!
//! These tests use wiremock to serve a small site and run every stage
//! end-to-end over the in-process broker.

use std::sync::Arc;
use std::time::Duration;
use sumi_lattice::config::{
    Config, CrawlConfig, DatabaseConfig, HttpConfig, UserAgentConfig, WorkersConfig,
};
use sumi_lattice::crawler::Coordinator;
use sumi_lattice::output::{load_statistics, CrawlStatistics};
use sumi_lattice::queue::InMemoryBroker;
use sumi_lattice::storage::{SqliteStorage, Storage};
use sumi_lattice::url::extract_domain;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with an in-memory store and no crawl delay
fn create_test_config() -> Config {
    Config {
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        database: DatabaseConfig {
            path: ":memory:".to_string(),
        },
        http: HttpConfig {
            timeout_secs: 5,
            retries: 0,
        },
        crawl: CrawlConfig {
            default_crawl_delay: 0,
            ..CrawlConfig::default()
        },
        workers: WorkersConfig {
            selector_pools: 2,
            ..WorkersConfig::default()
        },
        seeds: vec![],
    }
}

async fn mount_html(server: &MockServer, page: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .mount(server)
        .await;
}

/// Serves a four page site: a root, two pages it links to, and one page only
/// the sitemap knows about
async fn mount_site(server: &MockServer) {
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "User-agent: *\nCrawl-delay: 0\nDisallow: /private\n\nSitemap: {}/sitemap.xml\n",
            base
        )))
        .mount(server)
        .await;

    let sitemap = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{base}/from-sitemap</loc><changefreq>daily</changefreq><priority>0.9</priority></url>
  <url><loc>{base}/archive</loc><changefreq>never</changefreq></url>
</urlset>"#
    );
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sitemap, "application/xml"))
        .mount(server)
        .await;

    mount_html(
        server,
        "/",
        format!(
            r#"<html lang="en"><head><title>Root</title></head><body>
<h1>Root</h1>
<a href="/page1">one</a>
<a href="{base}/page2/">two</a>
<a href="/private/secret">secret</a>
</body></html>"#
        ),
    )
    .await;
    mount_html(
        server,
        "/page1",
        r#"<html><head><title>One</title></head><body><p>One</p><a href="/">home</a></body></html>"#
            .to_string(),
    )
    .await;
    mount_html(
        server,
        "/page2",
        r#"<html><head><title>Two</title></head><body><p>Two</p><a href="/page1">one</a></body></html>"#
            .to_string(),
    )
    .await;
    mount_html(
        server,
        "/from-sitemap",
        r#"<html><head><title>Mapped</title></head><body><p>Mapped</p></body></html>"#.to_string(),
    )
    .await;
}

/// Polls the store until `done` holds or the timeout elapses
async fn wait_for<F>(storage: &SqliteStorage, timeout: Duration, done: F) -> CrawlStatistics
where
    F: Fn(&CrawlStatistics) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let stats = load_statistics(storage).expect("Failed to load statistics");
        if done(&stats) || tokio::time::Instant::now() >= deadline {
            return stats;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn test_full_pipeline_single_domain() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let base = server.uri();
    let host = extract_domain(&url::Url::parse(&base).unwrap()).unwrap();

    let storage = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let coordinator = Coordinator::with_parts(
        create_test_config(),
        Arc::clone(&storage),
        Arc::new(InMemoryBroker::new()),
    )
    .unwrap();
    coordinator.declare_queues().await.unwrap();
    coordinator.seed(&[base.clone()]).await.unwrap();

    let token = CancellationToken::new();
    let handles = coordinator.start(&token);

    // root, page1, page2, private/secret, from-sitemap, archive
    let stats = wait_for(&storage, Duration::from_secs(30), |s| {
        s.total_links == 6 && s.crawled_links == 5
    })
    .await;

    token.cancel();
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(stats.total_domains, 1);
    assert_eq!(stats.total_links, 6);
    assert_eq!(stats.crawled_links, 5);

    let link = |suffix: &str| {
        storage
            .read(|conn| conn.find_link_by_url(&format!("http://{}{}", host, suffix)))
            .unwrap()
            .unwrap_or_else(|| panic!("missing link {}", suffix))
    };

    let root = link("");
    assert_eq!(root.title.as_deref(), Some("Root"));
    assert_eq!(root.http_status, Some(200));

    // Refused by robots.txt: stamped without being fetched
    let secret = link("/private/secret");
    assert!(secret.last_crawled_at.is_some());
    assert!(secret.http_status.is_none());

    // Never-changing sitemap entries are not scheduled
    let archive = link("/archive");
    assert!(archive.last_crawled_at.is_none());

    let mapped = link("/from-sitemap");
    assert_eq!(mapped.title.as_deref(), Some("Mapped"));

    let outgoing = storage
        .read(|conn| conn.get_outgoing_links(root.id))
        .unwrap();
    assert_eq!(outgoing.len(), 3);

    let page1 = link("/page1");
    let incoming = storage
        .read(|conn| conn.get_incoming_links(page1.id))
        .unwrap();
    assert_eq!(incoming.len(), 2);

    let domain = storage
        .read(|conn| conn.find_domain_by_name(&host))
        .unwrap()
        .unwrap();
    assert_eq!(domain.has_robots_txt, Some(true));
    assert_eq!(domain.crawl_delay, 0);
    assert!(domain.last_crawled_at.is_some());

    let counters = coordinator.stats();
    let selector = counters
        .iter()
        .find(|(name, _)| *name == "selector")
        .map(|(_, snapshot)| *snapshot)
        .unwrap();
    assert!(selector.processed >= 4);
}

#[tokio::test]
async fn test_pipeline_stops_on_cancel() {
    let server = MockServer::start().await;

    let storage = Arc::new(SqliteStorage::new_in_memory().unwrap());
    let coordinator = Coordinator::with_parts(
        create_test_config(),
        Arc::clone(&storage),
        Arc::new(InMemoryBroker::new()),
    )
    .unwrap();
    coordinator.declare_queues().await.unwrap();
    coordinator.seed(&[server.uri()]).await.unwrap();

    let token = CancellationToken::new();
    let handles = coordinator.start(&token);

    // The site has no pages, so only the root link is registered and fails
    let stats = wait_for(&storage, Duration::from_secs(10), |s| s.crawled_links == 1).await;
    assert_eq!(stats.total_domains, 1);
    assert_eq!(stats.total_links, 1);

    token.cancel();
    let joined = tokio::time::timeout(Duration::from_secs(5), async {
        for handle in handles {
            handle.await.unwrap();
        }
    })
    .await;
    assert!(joined.is_ok(), "workers did not stop after cancellation");

    let root = storage
        .read(|conn| conn.find_link_by_url(&server.uri()))
        .unwrap()
        .unwrap();
    assert_eq!(root.http_status, Some(404));
}
