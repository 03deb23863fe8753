//! HTML content extraction
//!
//! This module turns a fetched page into the pieces the link graph stores:
//! - Semantic content (headings and paragraphs)
//! - Outbound hrefs, split into canonical links and raw relative hrefs
//! - Title, description, keywords and language metadata

use crate::url::canonicalize;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::OnceLock;

/// Marker appended to content cut at the char budget
pub const TRUNCATION_MARKER: &str = "...[truncated]";

const SEMANTIC_SELECTOR: &str =
    "body h1, body h2, body h3, body h4, body h5, body h6, body p";

/// Everything extracted from one HTML page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedPage {
    /// Semantic elements wrapped in `<body>`, `None` when the page has none
    pub content: Option<String>,

    /// Absolute http(s) hrefs in canonical form, deduplicated, in document order
    pub safe_links: Vec<String>,

    /// Hrefs not starting with `http`, as written, deduplicated
    pub unsafe_hrefs: Vec<String>,

    pub title: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub lang: Option<String>,
}

/// Extracts content, links and metadata from an HTML document
///
/// # Arguments
///
/// * `html` - The raw HTML
/// * `max_content_chars` - Char budget for the semantic content
///
/// # Returns
///
/// The extracted page. Missing tags yield `None` fields, never an error.
///
/// # Example
///
/// ```
/// use sumi_lattice::crawler::extract;
///
/// let html = r#"<html lang="en"><head><title>Test</title></head>
///     <body><h1>Hello</h1><a href="https://example.com/a/">A</a></body></html>"#;
/// let page = extract(html, 1000);
/// assert_eq!(page.title.as_deref(), Some("Test"));
/// assert_eq!(page.safe_links, vec!["https://www.example.com/a".to_string()]);
/// ```
pub fn extract(html: &str, max_content_chars: usize) -> ExtractedPage {
    let document = Html::parse_document(html);
    let (safe_links, unsafe_hrefs) = extract_hrefs(&document);

    ExtractedPage {
        content: extract_semantic_content(&document)
            .map(|content| truncate_content(&content, max_content_chars)),
        safe_links,
        unsafe_hrefs,
        title: extract_title(&document),
        description: extract_meta(&document, "description"),
        keywords: extract_meta(&document, "keywords").map(|k| k.replace(", ", ",")),
        lang: document
            .root_element()
            .value()
            .attr("lang")
            .map(|lang| lang.trim().to_string())
            .filter(|lang| !lang.is_empty()),
    }
}

fn anchor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<a\b[^>]*>.*?</a\s*>").expect("valid anchor regex"))
}

fn script_style_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
            .expect("valid script/style regex")
    })
}

/// Concatenates h1-h6 and p elements with anchors, scripts and styles removed
fn extract_semantic_content(document: &Html) -> Option<String> {
    let selector = Selector::parse(SEMANTIC_SELECTOR).ok()?;

    let mut joined = String::new();
    let mut found = false;
    for element in document.select(&selector) {
        found = true;
        let fragment = element.html().replace(['\n', '\r'], "");
        let fragment = script_style_regex().replace_all(&fragment, "");
        joined.push_str(&anchor_regex().replace_all(&fragment, ""));
    }

    if !found {
        return None;
    }

    Some(format!("<body>{}</body>", joined))
}

/// Cuts content to `max_chars` chars and appends the truncation marker
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{}", &content[..idx], TRUNCATION_MARKER),
        None => content.to_string(),
    }
}

/// Splits anchor hrefs into canonical absolute links and raw relative hrefs
///
/// Fragment-only and empty hrefs are ignored.
fn extract_hrefs(document: &Html) -> (Vec<String>, Vec<String>) {
    let mut safe = Vec::new();
    let mut unsafe_hrefs = Vec::new();

    let Ok(selector) = Selector::parse("a[href]") else {
        return (safe, unsafe_hrefs);
    };

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if href.is_empty() || href.starts_with('#') {
            continue;
        }

        if !href.starts_with("http") && !unsafe_hrefs.iter().any(|h| h == href) {
            unsafe_hrefs.push(href.to_string());
        }

        if let Ok(canonical) = canonicalize(href) {
            if !safe.contains(&canonical.url) {
                safe.push(canonical.url);
            }
        }
    }

    (safe, unsafe_hrefs)
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_meta(document: &Html, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!("meta[name=\"{}\"]", name)).ok()?;

    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
}
