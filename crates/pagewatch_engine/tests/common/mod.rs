#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use pagewatch_engine::{
    ContentSelector, Document, DocumentFetcher, ElementSelector, FailureKind, FetchError,
    FetchFailure, ScrapeJobConfig,
};

pub fn init_logging() {
    pagewatch_logging::initialize_for_tests();
}

/// `(id, body, href)` per list item.
pub type Item<'a> = (&'a str, &'a str, &'a str);

pub fn listing(items: &[Item<'_>]) -> String {
    let mut html = String::from("<html><head><title>Listing</title></head><body><ul>");
    for (id, body, href) in items {
        html.push_str(&format!(
            "<li class=\"item\"><a class=\"link\" data-id=\"{id}\" href=\"{href}\">{id}</a>\
             <p class=\"body\">\n\t{body}\t\n</p></li>"
        ));
    }
    html.push_str("</ul></body></html>");
    html
}

/// Items whose href is `/items/{id}` and body is `Body {id}`.
pub fn simple_listing(ids: &[&str]) -> String {
    let items: Vec<(String, String, String)> = ids
        .iter()
        .map(|id| (id.to_string(), format!("Body {id}"), format!("/items/{id}")))
        .collect();
    let borrowed: Vec<Item<'_>> = items
        .iter()
        .map(|(id, body, href)| (id.as_str(), body.as_str(), href.as_str()))
        .collect();
    listing(&borrowed)
}

pub fn content_selector() -> ContentSelector {
    ContentSelector {
        list_item: ElementSelector::text("li.item"),
        id: ElementSelector::attr("a.link", "data-id"),
        content: ElementSelector::text("p.body"),
        url: ElementSelector::attr("a.link", "href"),
    }
}

pub fn job_config(template: impl Into<String>, position_file: &Path) -> ScrapeJobConfig {
    ScrapeJobConfig {
        job: "test_job".to_string(),
        position_file: position_file.to_path_buf(),
        start_page_offset: 1,
        page_offset_limit: 2,
        site_url_template: template.into(),
        content_selector: content_selector(),
        poll_interval_secs: 60,
    }
}

pub fn ids(records: &[pagewatch_engine::ContentRecord]) -> Vec<&str> {
    records.iter().map(|record| record.id.as_str()).collect()
}

/// In-memory fetcher keyed by URL. Unknown URLs answer like a 404.
#[derive(Default)]
pub struct StaticFetcher {
    pages: Mutex<HashMap<String, Result<String, FetchError>>>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&self, url: &str, html: String) {
        self.pages.lock().unwrap().insert(url.to_string(), Ok(html));
    }

    pub fn fail(&self, url: &str, err: FetchError) {
        self.pages.lock().unwrap().insert(url.to_string(), Err(err));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DocumentFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
        self.requests.lock().unwrap().push(url.to_string());
        let entry = self.pages.lock().unwrap().get(url).cloned();
        match entry {
            Some(Ok(html)) => Ok(Document::parse(url, &html, "UTF-8")),
            Some(Err(err)) => Err(err),
            None => Err(FetchError::Fatal(FetchFailure {
                kind: FailureKind::HttpStatus(404),
                message: "404 Not Found".to_string(),
            })),
        }
    }
}
