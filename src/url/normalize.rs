use crate::url::domain::extract_domain;
use crate::UrlError;
use url::Url;

/// A URL reduced to the dedup key used for links and domains
///
/// The canonical form is `scheme://host` followed by the path without its
/// trailing slash. Query strings and fragments are not part of the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalUrl {
    /// `http` or `https`
    pub scheme: String,
    /// Canonical host, including a non-default port
    pub host: String,
    /// Full canonical URL
    pub url: String,
}

/// Canonicalizes an absolute URL
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject anything that is not absolute `http(s)`
/// 2. Lowercase the host
/// 3. Prefix `www.` when the host is a bare `name.tld` (exactly one dot)
/// 4. Keep the path, dropping trailing slashes
/// 5. Drop query and fragment
///
/// # Arguments
///
/// * `raw` - The absolute URL to canonicalize
///
/// # Returns
///
/// * `Ok(CanonicalUrl)` - Canonical URL and host
/// * `Err(UrlError)` - The URL could not be parsed or is not http(s)
///
/// # Examples
///
/// ```
/// use sumi_lattice::url::canonicalize;
///
/// let canonical = canonicalize("https://Example.com/docs/?page=2#top").unwrap();
/// assert_eq!(canonical.url, "https://www.example.com/docs");
/// assert_eq!(canonical.host, "www.example.com");
/// ```
pub fn canonicalize(raw: &str) -> Result<CanonicalUrl, UrlError> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = canonical_host(&url)?;
    let path = url.path().trim_end_matches('/');

    Ok(CanonicalUrl {
        scheme: url.scheme().to_string(),
        url: format!("{}://{}{}", url.scheme(), host, path),
        host,
    })
}

/// Returns the canonical host of a parsed URL
///
/// Hosts of the form `name.tld` gain a `www.` prefix so that `example.com`
/// and `www.example.com` map onto one domain. Deeper hosts are left alone.
pub fn canonical_host(url: &Url) -> Result<String, UrlError> {
    let name = url
        .host_str()
        .filter(|h| !h.is_empty())
        .map(str::to_lowercase)
        .ok_or(UrlError::MissingDomain)?;

    if name.matches('.').count() == 1 && !name.starts_with("www") {
        return Ok(match url.port() {
            Some(port) => format!("www.{}:{}", name, port),
            None => format!("www.{}", name),
        });
    }

    extract_domain(url).ok_or(UrlError::MissingDomain)
}
