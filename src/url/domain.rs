use url::Url;

/// Extracts the domain from a URL
///
/// The host is lowercased. A non-default port stays attached so that servers
/// on different ports are treated as different domains.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_lattice::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:3000/").unwrap();
/// assert_eq!(extract_domain(&url), Some("127.0.0.1:3000".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str().filter(|h| !h.is_empty())?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Resolves a relative href against the domain that served it
///
/// Only two relative shapes are followed:
/// - protocol-relative (`//host/path`) takes the domain's scheme
/// - root-relative (`/path`) is appended to `scheme://domain`
///
/// Anything else (`page.html`, `../up`, `?q=1`, `mailto:`) yields `None`.
///
/// # Arguments
///
/// * `href` - The raw href as found in the page
/// * `scheme` - Scheme of the owning domain
/// * `domain` - Name of the owning domain (host, optionally with port)
pub fn resolve_href(href: &str, scheme: &str, domain: &str) -> Option<String> {
    let href = href.trim();

    let candidate = if href.starts_with("//") {
        format!("{}:{}", scheme, href)
    } else if href.starts_with('/') {
        format!("{}://{}{}", scheme, domain, href)
    } else {
        return None;
    };

    let url = Url::parse(&candidate).ok()?;
    url.host_str()?;
    Some(url.to_string())
}
