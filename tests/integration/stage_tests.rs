//! Integration tests for the individual pipeline stages
//!
//! Each stage is driven directly through `Stage::handle` against a wiremock
//! server and an in-memory link graph.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use sumi_lattice::config::{CrawlConfig, HttpConfig, UserAgentConfig};
use sumi_lattice::crawler::HttpClient;
use sumi_lattice::queue::{DOMAINS, LINKS, PRIORITIZER, SITEMAPS};
use sumi_lattice::robots::RobotsCache;
use sumi_lattice::state::ChangeFreq;
use sumi_lattice::storage::{NewLink, SqliteStorage, Storage, StorageError};
use sumi_lattice::url::extract_domain;
use sumi_lattice::workers::{DomainWorker, LinkWorker, Prioritizer, Selector, SitemapWorker, Stage};
use sumi_lattice::SumiError;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn http_client() -> HttpClient {
    let http = HttpConfig {
        timeout_secs: 5,
        retries: 0,
    };
    HttpClient::new(&user_agent(), &http).expect("Failed to build HTTP client")
}

fn robots_cache() -> Arc<RobotsCache> {
    Arc::new(RobotsCache::new(
        http_client(),
        "TestBot",
        CrawlConfig::default(),
    ))
}

fn storage() -> Arc<SqliteStorage> {
    Arc::new(SqliteStorage::new_in_memory().expect("Failed to open storage"))
}

/// The domain name a mock server is registered under, e.g. `127.0.0.1:12345`
fn host_of(server: &MockServer) -> String {
    let url = url::Url::parse(&server.uri()).expect("Failed to parse base URL");
    extract_domain(&url).expect("Failed to extract host")
}

async fn mount_robots(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_html(server: &MockServer, page: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html"))
        .mount(server)
        .await;
}

fn insert_link(storage: &SqliteStorage, link: NewLink) -> Uuid {
    storage
        .transaction(|tx| -> Result<Uuid, StorageError> { Ok(tx.insert_link(&link)?.0.id) })
        .expect("Failed to insert link")
}

/// Registers a domain the selector may crawl without waiting
fn register_domain(storage: &SqliteStorage, name: &str) {
    storage
        .transaction(|tx| -> Result<(), StorageError> {
            let (mut domain, _) = tx.upsert_domain(name, "http")?;
            domain.crawl_delay = 0;
            tx.update_domain(&domain)
        })
        .expect("Failed to register domain");
}

/// Registers a domain that was crawled at `last_crawled_at` with `crawl_delay`
fn register_crawled_domain(
    storage: &SqliteStorage,
    name: &str,
    crawl_delay: u32,
    last_crawled_at: DateTime<Utc>,
) {
    storage
        .transaction(|tx| -> Result<(), StorageError> {
            let (mut domain, _) = tx.upsert_domain(name, "http")?;
            domain.crawl_delay = crawl_delay;
            domain.last_crawled_at = Some(last_crawled_at);
            tx.update_domain(&domain)
        })
        .expect("Failed to register domain");
}

// ===== Domain worker =====

#[tokio::test]
async fn test_domain_worker_reads_robots_and_emits_sitemaps() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_robots(
        &server,
        format!("User-agent: *\nCrawl-delay: 3\nAllow: /\n\nSitemap: {}/sitemap.xml\n", base),
    )
    .await;

    let storage = storage();
    let worker = DomainWorker::new(Arc::clone(&storage), robots_cache());

    let transition = worker.handle(&base).await.unwrap();
    let host = host_of(&server);

    assert_eq!(transition.added, 1);
    assert_eq!(transition.bodies(LINKS), vec![format!("http://{}", host)]);
    assert_eq!(transition.bodies(SITEMAPS), vec![format!("{}/sitemap.xml", base)]);

    let domain = storage
        .read(|conn| conn.find_domain_by_name(&host))
        .unwrap()
        .expect("domain should be registered");
    assert_eq!(domain.protocol, "http");
    assert_eq!(domain.crawl_delay, 3);
    assert_eq!(domain.has_robots_txt, Some(true));
    assert_eq!(domain.is_blocked, Some(false));
    assert!(domain.last_processed_at.is_some());

    // A second visit updates the same row
    let again = worker.handle(&base).await.unwrap();
    assert_eq!(again.added, 0);
    let count = storage.read(|conn| conn.count_domains()).unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_domain_worker_without_robots() {
    let server = MockServer::start().await;
    let storage = storage();
    let worker = DomainWorker::new(Arc::clone(&storage), robots_cache());

    let transition = worker.handle(&server.uri()).await.unwrap();
    assert!(transition.bodies(SITEMAPS).is_empty());
    assert_eq!(transition.bodies(LINKS).len(), 1);

    let domain = storage
        .read(|conn| conn.find_domain_by_name(&host_of(&server)))
        .unwrap()
        .unwrap();
    assert_eq!(domain.has_robots_txt, Some(false));
    assert_eq!(domain.is_blocked, Some(false));
    assert_eq!(domain.crawl_delay, CrawlConfig::default().default_crawl_delay);
}

#[tokio::test]
async fn test_domain_worker_marks_blocked_domain() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: TestBot\nDisallow: /\n".to_string()).await;

    let storage = storage();
    let worker = DomainWorker::new(Arc::clone(&storage), robots_cache());
    worker.handle(&server.uri()).await.unwrap();

    let domain = storage
        .read(|conn| conn.find_domain_by_name(&host_of(&server)))
        .unwrap()
        .unwrap();
    assert_eq!(domain.is_blocked, Some(true));
}

#[tokio::test]
async fn test_domain_worker_rejects_bad_input() {
    let worker = DomainWorker::new(storage(), robots_cache());
    assert!(worker.handle("not a url").await.is_err());
    assert!(worker.handle("ftp://files.example.com").await.is_err());
}

// ===== Link worker =====

#[tokio::test]
async fn test_link_worker_registers_canonical_link() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private\n".to_string()).await;

    let storage = storage();
    let worker = LinkWorker::new(Arc::clone(&storage), robots_cache(), 512);
    let host = host_of(&server);

    let transition = worker
        .handle(&format!("{}/about/?ref=home#team", server.uri()))
        .await
        .unwrap();

    let link = storage
        .read(|conn| conn.find_link_by_url(&format!("http://{}/about", host)))
        .unwrap()
        .expect("link should be stored canonically");
    assert_eq!(transition.added, 1);
    assert_eq!(transition.bodies(DOMAINS), vec![format!("http://{}", host)]);
    assert_eq!(transition.bodies(PRIORITIZER), vec![link.id.to_string()]);
    assert!(link.last_crawled_at.is_none());

    // Known link on a known domain: only the prioritizer hears about it
    let again = worker
        .handle(&format!("{}/about", server.uri()))
        .await
        .unwrap();
    assert_eq!(again.added, 0);
    assert!(again.bodies(DOMAINS).is_empty());
    assert_eq!(again.bodies(PRIORITIZER), vec![link.id.to_string()]);
}

#[tokio::test]
async fn test_link_worker_stamps_disallowed_link() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /private\n".to_string()).await;

    let storage = storage();
    let worker = LinkWorker::new(Arc::clone(&storage), robots_cache(), 512);

    let transition = worker
        .handle(&format!("{}/private/report", server.uri()))
        .await
        .unwrap();
    assert!(transition.bodies(PRIORITIZER).is_empty());

    let link = storage
        .read(|conn| {
            conn.find_link_by_url(&format!("http://{}/private/report", host_of(&server)))
        })
        .unwrap()
        .unwrap();
    assert!(link.last_crawled_at.is_some());
    assert!(link.http_status.is_none());
}

#[tokio::test]
async fn test_link_worker_rejects_long_url() {
    let server = MockServer::start().await;
    let worker = LinkWorker::new(storage(), robots_cache(), 40);

    let long = format!("{}/{}", server.uri(), "a".repeat(60));
    assert!(worker.handle(&long).await.is_err());
}

// ===== Sitemap worker =====

#[tokio::test]
async fn test_sitemap_worker_expands_urlset() {
    let server = MockServer::start().await;
    let base = server.uri();
    let host = host_of(&server);

    let sitemap = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>{base}/news/</loc>
    <priority>2.0</priority>
    <changefreq>Weekly</changefreq>
  </url>
  <url>
    <loc>{base}/about</loc>
  </url>
  <url>
    <loc>{base}/archive.xml.gz</loc>
  </url>
</urlset>"#
    );
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sitemap, "application/xml"))
        .mount(&server)
        .await;

    let storage = storage();
    let worker = SitemapWorker::new(Arc::clone(&storage), http_client(), 512);
    let transition = worker
        .handle(&format!("{}/sitemap.xml", base))
        .await
        .unwrap();

    assert_eq!(transition.added, 2);
    assert_eq!(
        transition.bodies(LINKS),
        vec![format!("http://{}/news", host), format!("http://{}/about", host)]
    );

    let news = storage
        .read(|conn| conn.find_link_by_url(&format!("http://{}/news", host)))
        .unwrap()
        .unwrap();
    assert_eq!(news.priority, 1.0);
    assert_eq!(news.change_freq, ChangeFreq::Weekly);

    let about = storage
        .read(|conn| conn.find_link_by_url(&format!("http://{}/about", host)))
        .unwrap()
        .unwrap();
    assert_eq!(about.priority, 0.5);
    assert_eq!(about.change_freq, ChangeFreq::Monthly);

    // Existing links are re-emitted but not re-inserted
    let again = worker
        .handle(&format!("{}/sitemap.xml", base))
        .await
        .unwrap();
    assert_eq!(again.added, 0);
    assert_eq!(again.bodies(LINKS).len(), 2);
}

#[tokio::test]
async fn test_sitemap_worker_forwards_nested_indexes() {
    let server = MockServer::start().await;
    let base = server.uri();

    let index = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>{base}/sitemap-posts.xml</loc></sitemap>
  <sitemap><loc>{base}/sitemap-pages.xml</loc></sitemap>
</sitemapindex>"#
    );
    Mock::given(method("GET"))
        .and(path("/sitemap_index.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(index, "application/xml"))
        .mount(&server)
        .await;

    let worker = SitemapWorker::new(storage(), http_client(), 512);
    let transition = worker
        .handle(&format!("{}/sitemap_index.xml", base))
        .await
        .unwrap();

    assert_eq!(
        transition.bodies(SITEMAPS),
        vec![
            format!("{}/sitemap-posts.xml", base),
            format!("{}/sitemap-pages.xml", base)
        ]
    );
    assert!(transition.bodies(LINKS).is_empty());
}

#[tokio::test]
async fn test_sitemap_worker_skips_missing_sitemap() {
    let server = MockServer::start().await;
    let storage = storage();
    let worker = SitemapWorker::new(Arc::clone(&storage), http_client(), 512);

    let transition = worker
        .handle(&format!("{}/sitemap.xml", server.uri()))
        .await
        .unwrap();
    assert!(transition.outbound.is_empty());
    assert_eq!(storage.read(|conn| conn.count_links()).unwrap(), 0);
}

// ===== Prioritizer =====

#[tokio::test]
async fn test_prioritizer_rejects_unknown_link() {
    let prioritizer = Prioritizer::new(storage());

    let missing = prioritizer.handle(&Uuid::new_v4().to_string()).await;
    assert!(matches!(missing, Err(SumiError::LinkNotFound(_))));

    let garbage = prioritizer.handle("definitely-not-a-uuid").await;
    assert!(matches!(garbage, Err(SumiError::InvalidId(_))));
}

// ===== Selector =====

#[tokio::test]
async fn test_selector_crawls_page_and_records_edges() {
    let server = MockServer::start().await;
    let base = server.uri();
    let host = host_of(&server);

    let html = format!(
        r##"<html lang="en">
<head>
  <title>Home page</title>
  <meta name="description" content="A page for testing">
  <meta name="keywords" content="rust, crawler">
  <script>var tracking = true;</script>
</head>
<body>
  <h1>Welcome</h1>
  <p>Read the <a href="/docs/">docs</a> or the <a href="{base}/blog">blog</a>.</p>
  <a href="https://www.other-site.org/page">elsewhere</a>
  <a href="/docs">docs again</a>
  <a href="#top">top</a>
</body>
</html>"##
    );
    mount_html(&server, "/", html).await;

    let storage = storage();
    register_domain(&storage, &host);
    let root = insert_link(&storage, NewLink::new(format!("http://{}", host)));

    let selector = Selector::new(Arc::clone(&storage), http_client(), 100_000, 512);
    let transition = selector.handle(&root.to_string()).await.unwrap();

    let mut discovered: Vec<&str> = transition.bodies(LINKS);
    discovered.sort_unstable();
    let blog = format!("http://{}/blog", host);
    let docs = format!("http://{}/docs", host);
    assert_eq!(
        discovered,
        vec![
            blog.as_str(),
            docs.as_str(),
            "https://www.other-site.org/page"
        ]
    );
    assert_eq!(transition.added, 3);

    let link = storage.read(|conn| conn.get_link(root)).unwrap().unwrap();
    assert_eq!(link.http_status, Some(200));
    assert_eq!(link.title.as_deref(), Some("Home page"));
    assert_eq!(link.description.as_deref(), Some("A page for testing"));
    assert_eq!(link.keywords.as_deref(), Some("rust,crawler"));
    assert_eq!(link.lang.as_deref(), Some("en"));
    assert!(link.content_type.as_deref().unwrap().starts_with("text/html"));
    assert!(link.last_crawled_at.is_some());

    let content = link.content.expect("content should be stored");
    assert!(content.contains("Welcome"));
    assert!(!content.contains("tracking"));

    let outgoing = storage.read(|conn| conn.get_outgoing_links(root)).unwrap();
    assert_eq!(outgoing.len(), 3);

    let domain = storage
        .read(|conn| conn.find_domain_by_name(&host))
        .unwrap()
        .unwrap();
    assert!(domain.last_crawled_at.is_some());

    // Revisiting creates no new links and no duplicate edges
    let again = selector.handle(&root.to_string()).await.unwrap();
    assert!(again.bodies(LINKS).is_empty());
    assert_eq!(storage.read(|conn| conn.count_relations()).unwrap(), 3);
    assert_eq!(storage.read(|conn| conn.count_links()).unwrap(), 4);
}

#[tokio::test]
async fn test_selector_waits_out_crawl_delay() {
    let server = MockServer::start().await;
    let host = host_of(&server);
    mount_html(
        &server,
        "/slow",
        "<html><head><title>Slow</title></head><body><p>Later</p></body></html>".to_string(),
    )
    .await;

    let storage = storage();
    let started = Instant::now();
    let previous = Utc::now();
    register_crawled_domain(&storage, &host, 2, previous);
    let id = insert_link(&storage, NewLink::new(format!("http://{}/slow", host)));

    let selector = Selector::new(Arc::clone(&storage), http_client(), 100_000, 512);
    selector.handle(&id.to_string()).await.unwrap();

    assert!(
        started.elapsed() >= Duration::from_secs(2),
        "crawled after {:?}",
        started.elapsed()
    );

    let domain = storage
        .read(|conn| conn.find_domain_by_name(&host))
        .unwrap()
        .unwrap();
    let crawled_at = domain.last_crawled_at.unwrap();
    assert!(crawled_at - previous >= chrono::Duration::seconds(2));

    let link = storage.read(|conn| conn.get_link(id)).unwrap().unwrap();
    assert_eq!(link.last_crawled_at, Some(crawled_at));
    assert_eq!(link.http_status, Some(200));
    assert_eq!(link.title.as_deref(), Some("Slow"));
}

#[tokio::test]
async fn test_selector_records_error_status() {
    let server = MockServer::start().await;
    let host = host_of(&server);

    let storage = storage();
    register_domain(&storage, &host);
    let id = insert_link(&storage, NewLink::new(format!("http://{}/gone", host)));

    let selector = Selector::new(Arc::clone(&storage), http_client(), 100_000, 512);
    let transition = selector.handle(&id.to_string()).await.unwrap();
    assert!(transition.outbound.is_empty());

    let link = storage.read(|conn| conn.get_link(id)).unwrap().unwrap();
    assert_eq!(link.http_status, Some(404));
    assert!(link.last_crawled_at.is_some());
    assert!(link.content.is_none());
    assert!(link.content_type.is_none());
}

#[tokio::test]
async fn test_selector_stops_at_non_html() {
    let server = MockServer::start().await;
    let host = host_of(&server);
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let storage = storage();
    register_domain(&storage, &host);
    let id = insert_link(&storage, NewLink::new(format!("http://{}/report.pdf", host)));

    let selector = Selector::new(Arc::clone(&storage), http_client(), 100_000, 512);
    let transition = selector.handle(&id.to_string()).await.unwrap();
    assert!(transition.outbound.is_empty());

    let link = storage.read(|conn| conn.get_link(id)).unwrap().unwrap();
    assert_eq!(link.http_status, Some(200));
    assert_eq!(link.content_type.as_deref(), Some("application/pdf"));
    assert!(link.content.is_none());
    assert!(link.title.is_none());
}

#[tokio::test]
async fn test_selector_requires_known_domain() {
    let server = MockServer::start().await;
    let storage = storage();
    let id = insert_link(
        &storage,
        NewLink::new(format!("http://{}/orphan", host_of(&server))),
    );

    let selector = Selector::new(Arc::clone(&storage), http_client(), 100_000, 512);
    let result = selector.handle(&id.to_string()).await;
    assert!(matches!(result, Err(SumiError::DomainNotFound(_))));
}
