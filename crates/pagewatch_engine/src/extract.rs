use pagewatch_logging::{job_debug, job_warn};
use scraper::{ElementRef, Selector};
use url::Url;

use crate::config::{ContentSelector, ElementSelector, ExtractType, ScrapeJobConfig};
use crate::{ContentRecord, Document};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field} selector {selector:?}: {message}")]
pub struct SelectorError {
    pub field: &'static str,
    pub selector: String,
    pub message: String,
}

/// An `ElementSelector` with its CSS selector parsed.
#[derive(Debug, Clone)]
struct FieldSelector {
    selector: Selector,
    extract_type: ExtractType,
    attr: String,
}

impl FieldSelector {
    fn compile(field: &'static str, element: &ElementSelector) -> Result<Self, SelectorError> {
        let selector = Selector::parse(&element.selector).map_err(|err| SelectorError {
            field,
            selector: element.selector.clone(),
            message: err.to_string(),
        })?;
        Ok(Self {
            selector,
            extract_type: element.extract_type,
            attr: element.attr.clone(),
        })
    }

    /// Value of this field inside `item`: the attribute of the first match,
    /// or the concatenated text of every match. Empty when nothing matches.
    fn extract(&self, item: ElementRef<'_>) -> String {
        match self.extract_type {
            ExtractType::Attr => item
                .select(&self.selector)
                .next()
                .and_then(|el| el.value().attr(&self.attr))
                .unwrap_or_default()
                .to_string(),
            ExtractType::Text => item
                .select(&self.selector)
                .flat_map(|el| el.text())
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    list_item: Selector,
    id: FieldSelector,
    content: FieldSelector,
    url: FieldSelector,
}

impl CompiledSelectors {
    pub fn compile(selectors: &ContentSelector) -> Result<Self, SelectorError> {
        let list_item = FieldSelector::compile("list_item", &selectors.list_item)?.selector;
        Ok(Self {
            list_item,
            id: FieldSelector::compile("id", &selectors.id)?,
            content: FieldSelector::compile("content", &selectors.content)?,
            url: FieldSelector::compile("url", &selectors.url)?,
        })
    }
}

/// Result of extracting one page.
///
/// No records and no watermark hit means the selectors matched nothing
/// usable; no records with a hit means nothing new.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extraction {
    pub records: Vec<ContentRecord>,
    pub hit_watermark: bool,
}

/// Turns a listing page into records, newest first, stopping at the
/// watermark.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    job: String,
    selectors: CompiledSelectors,
    site_origin: Option<Url>,
}

impl ContentExtractor {
    pub fn new(job: impl Into<String>, selectors: CompiledSelectors, site_origin: Option<Url>) -> Self {
        Self {
            job: job.into(),
            selectors,
            site_origin,
        }
    }

    pub fn for_job(config: &ScrapeJobConfig) -> Result<Self, SelectorError> {
        Ok(Self::new(
            config.job.clone(),
            CompiledSelectors::compile(&config.content_selector)?,
            site_origin(&config.site_url_template),
        ))
    }

    pub fn extract(&self, document: &Document, watermark: &str) -> Extraction {
        let mut extraction = Extraction::default();

        for item in document.html().select(&self.selectors.list_item) {
            let id = self.selectors.id.extract(item);
            if id.is_empty() {
                job_warn!(self.job, "Skipping item without id on {}", document.url());
                continue;
            }
            if !watermark.is_empty() && id == watermark {
                job_debug!(self.job, "Reached watermark {:?} on {}", id, document.url());
                extraction.hit_watermark = true;
                break;
            }

            let body = self.selectors.content.extract(item).trim().to_string();
            if body.is_empty() {
                job_warn!(self.job, "Skipping item {:?} without content", id);
                continue;
            }

            let raw_url = self.selectors.url.extract(item);
            if raw_url.is_empty() {
                job_warn!(self.job, "Item {:?} has no url", id);
            }
            let url = self.resolve_url(raw_url.trim());

            extraction.records.push(ContentRecord { id, body, url });
        }

        extraction
    }

    fn resolve_url(&self, raw: &str) -> String {
        if has_http_scheme(raw) {
            return raw.to_string();
        }
        self.site_origin
            .as_ref()
            .and_then(|origin| origin.join(raw).ok())
            .map(|url| url.to_string())
            .unwrap_or_else(|| raw.to_string())
    }
}

fn has_http_scheme(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Scheme and host (plus port) of the site a URL template points at.
///
/// A template without a scheme is read as `https://`. Returns `None` when no
/// host can be found.
pub fn site_origin(template: &str) -> Option<Url> {
    let parsed = match Url::parse(template) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{}", template.trim_start_matches('/'))).ok()?
        }
        Err(_) => return None,
    };
    parsed.host_str()?;
    if parsed.cannot_be_a_base() {
        return None;
    }
    Url::parse(&parsed.origin().ascii_serialization()).ok()
}
