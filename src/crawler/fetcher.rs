//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the pipeline, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests for robots.txt, sitemaps and pages
//! - Retry logic for transient transport failures
//! - Error classification

use crate::config::{HttpConfig, UserAgentConfig};
use crate::SumiError;
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client};
use std::time::Duration;

/// A completed HTTP exchange
///
/// Any status code counts as a response; deciding what a 404 or a 500 means
/// is left to the caller.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Final URL after redirects
    pub url: String,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value, if present
    pub content_type: Option<String>,
    /// Response body
    pub body: String,
}

impl FetchResponse {
    /// Returns true if the response carries an HTML document
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(false)
    }
}

/// Formats the identifying user agent string
///
/// Format: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use sumi_lattice::config::UserAgentConfig;
/// use sumi_lattice::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "SumiLattice".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(5)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// HTTP client shared by every stage
///
/// Cheap to clone: the underlying `reqwest::Client` is reference counted.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retries: u32,
}

impl HttpClient {
    /// Creates a client from the user agent and transport configuration
    pub fn new(user_agent: &UserAgentConfig, http: &HttpConfig) -> Result<Self, SumiError> {
        let client = build_http_client(user_agent, Duration::from_secs(http.timeout_secs))?;
        Ok(Self {
            client,
            retries: http.retries,
        })
    }

    /// Fetches a URL with GET
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Timeout | Retry up to `retries` times |
    /// | Connection failure | Retry up to `retries` times |
    /// | Any HTTP status | Returned as a response |
    /// | Anything else | Immediate error |
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to fetch
    ///
    /// # Returns
    ///
    /// * `Ok(FetchResponse)` - The server answered
    /// * `Err(SumiError::Timeout)` - Every attempt timed out
    /// * `Err(SumiError::Http)` - The transport failed
    pub async fn fetch(&self, url: &str) -> Result<FetchResponse, SumiError> {
        let mut attempt = 0;

        loop {
            match self.try_fetch(url).await {
                Ok(response) => return Ok(response),
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < self.retries => {
                    attempt += 1;
                    tracing::debug!("Retrying {} ({}/{}): {}", url, attempt, self.retries, e);
                }
                Err(e) if e.is_timeout() => {
                    return Err(SumiError::Timeout {
                        url: url.to_string(),
                    })
                }
                Err(e) => {
                    return Err(SumiError::Http {
                        url: url.to_string(),
                        source: e,
                    })
                }
            }
        }
    }

    async fn try_fetch(&self, url: &str) -> Result<FetchResponse, reqwest::Error> {
        let response = self.client.get(url).send().await?;

        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = response.text().await?;

        Ok(FetchResponse {
            url: final_url,
            status,
            content_type,
            body,
        })
    }
}
