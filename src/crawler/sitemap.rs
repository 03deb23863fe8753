//! Sitemap expansion
//!
//! Handles both sitemap shapes: `<sitemapindex>` documents listing nested
//! sitemaps, and `<urlset>` documents listing pages with crawl hints.

use crate::state::{normalize_priority, ChangeFreq, DEFAULT_PRIORITY};
use xml::reader::{ParserConfig2, XmlEvent};
use xml::EventReader;

/// A page listed in a `<urlset>`
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    /// The `<loc>` value as written
    pub url: String,
    /// Normalized priority
    pub priority: f64,
    pub change_freq: ChangeFreq,
}

/// The result of expanding one sitemap document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SitemapContents {
    /// Nested sitemap URLs from `<sitemapindex>` entries
    pub indexes: Vec<String>,
    /// Page entries from `<urlset>` entries
    pub links: Vec<SitemapEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Loc,
    Priority,
    ChangeFreq,
}

#[derive(Debug, Default)]
struct PendingEntry {
    loc: String,
    priority: Option<String>,
    change_freq: Option<String>,
}

impl PendingEntry {
    fn push(&mut self, field: Field, text: &str) {
        match field {
            Field::Loc => self.loc.push_str(text),
            Field::Priority => self.priority.get_or_insert_with(String::new).push_str(text),
            Field::ChangeFreq => self
                .change_freq
                .get_or_insert_with(String::new)
                .push_str(text),
        }
    }

    fn into_entry(self) -> Option<SitemapEntry> {
        let url = self.loc.trim().to_string();
        if url.is_empty() {
            return None;
        }

        let priority = match self.priority.as_deref().map(str::trim) {
            Some(raw) => match raw.parse::<f64>() {
                Ok(value) => normalize_priority(value),
                Err(_) => {
                    tracing::warn!("{} is not a valid priority for {}", raw, url);
                    DEFAULT_PRIORITY
                }
            },
            None => DEFAULT_PRIORITY,
        };

        let change_freq = match self.change_freq.as_deref() {
            Some(raw) => ChangeFreq::parse_hint(raw).unwrap_or_else(|| {
                tracing::warn!("{} is not a valid change frequency for {}", raw.trim(), url);
                ChangeFreq::default()
            }),
            None => ChangeFreq::default(),
        };

        Some(SitemapEntry {
            url,
            priority,
            change_freq,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Container {
    Index,
    UrlSet,
}

/// Expands a sitemap or sitemap index document
///
/// Index locations ending in `.gz` are skipped. Entries without `<loc>` are
/// skipped. Malformed XML stops the expansion; everything parsed before the
/// error is kept.
///
/// # Arguments
///
/// * `xml` - The sitemap document
///
/// # Returns
///
/// The nested sitemap URLs and the page entries, in document order
pub fn expand_sitemap(xml: &str) -> SitemapContents {
    let config = ParserConfig2::new().ignore_comments(true);
    let reader = EventReader::new_with_config(xml.as_bytes(), config);

    let mut contents = SitemapContents::default();
    let mut container: Option<Container> = None;
    let mut pending: Option<PendingEntry> = None;
    let mut field: Option<Field> = None;
    // Element depth below the open entry; only its direct children carry fields
    let mut depth = 0usize;

    for event in reader {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Stopped sitemap expansion at malformed XML: {}", e);
                break;
            }
        };

        match event {
            XmlEvent::StartElement { name, .. } => match name.local_name.as_str() {
                "sitemapindex" => container = Some(Container::Index),
                "urlset" => container = Some(Container::UrlSet),
                "sitemap" if container == Some(Container::Index) && pending.is_none() => {
                    pending = Some(PendingEntry::default());
                    depth = 0;
                }
                "url" if container == Some(Container::UrlSet) && pending.is_none() => {
                    pending = Some(PendingEntry::default());
                    depth = 0;
                }
                local if pending.is_some() => {
                    depth += 1;
                    field = match local {
                        _ if depth > 1 => None,
                        "loc" => Some(Field::Loc),
                        "priority" => Some(Field::Priority),
                        "changefreq" => Some(Field::ChangeFreq),
                        _ => None,
                    };
                }
                _ => field = None,
            },
            XmlEvent::Characters(text) | XmlEvent::CData(text) => {
                if let (Some(entry), Some(field)) = (pending.as_mut(), field) {
                    entry.push(field, &text);
                }
            }
            XmlEvent::EndElement { name } => match name.local_name.as_str() {
                _ if pending.is_some() && depth > 0 => {
                    depth -= 1;
                    field = None;
                }
                "sitemap" if container == Some(Container::Index) => {
                    if let Some(entry) = pending.take() {
                        let loc = entry.loc.trim();
                        if !loc.is_empty() && !loc.ends_with(".gz") {
                            contents.indexes.push(loc.to_string());
                        }
                    }
                }
                "url" if container == Some(Container::UrlSet) => {
                    if let Some(entry) = pending.take().and_then(PendingEntry::into_entry) {
                        contents.links.push(entry);
                    }
                }
                "sitemapindex" | "urlset" => container = None,
                _ => field = None,
            },
            _ => {}
        }
    }

    contents
}
