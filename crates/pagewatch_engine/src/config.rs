//! Job configuration, loaded from RON and validated before any job starts.
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extract::{CompiledSelectors, SelectorError};
use crate::fetch::FetchSettings;

/// Placeholder replaced by the page offset in `site_url_template`.
pub const PAGE_PLACEHOLDER: &str = "{page}";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("invalid config for job {job:?}: {reason}")]
    Invalid { job: String, reason: String },
    #[error(transparent)]
    Selector(#[from] SelectorError),
}

impl ConfigError {
    fn invalid(job: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            job: job.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtractType {
    #[serde(rename = "attr")]
    Attr,
    #[default]
    #[serde(rename = "text")]
    Text,
}

/// How to pull one field out of an element: a CSS selector plus either the
/// text of the match or one of its attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSelector {
    pub selector: String,
    #[serde(default)]
    pub extract_type: ExtractType,
    #[serde(default)]
    pub attr: String,
}

impl ElementSelector {
    pub fn text(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            extract_type: ExtractType::Text,
            attr: String::new(),
        }
    }

    pub fn attr(selector: impl Into<String>, attr: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            extract_type: ExtractType::Attr,
            attr: attr.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSelector {
    pub list_item: ElementSelector,
    pub id: ElementSelector,
    pub content: ElementSelector,
    pub url: ElementSelector,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeJobConfig {
    pub job: String,
    pub position_file: PathBuf,
    pub start_page_offset: u32,
    pub page_offset_limit: u32,
    pub site_url_template: String,
    pub content_selector: ContentSelector,
    pub poll_interval_secs: u64,
}

impl ScrapeJobConfig {
    pub fn page_url(&self, page: u32) -> String {
        self.site_url_template.replace(PAGE_PLACEHOLDER, &page.to_string())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let job = self.job.as_str();
        if job.trim().is_empty() {
            return Err(ConfigError::invalid(job, "job name is empty"));
        }
        if self.start_page_offset > self.page_offset_limit {
            return Err(ConfigError::invalid(
                job,
                format!(
                    "start_page_offset {} exceeds page_offset_limit {}",
                    self.start_page_offset, self.page_offset_limit
                ),
            ));
        }
        if !self.site_url_template.contains(PAGE_PLACEHOLDER) {
            return Err(ConfigError::invalid(
                job,
                format!("site_url_template lacks the {PAGE_PLACEHOLDER} placeholder"),
            ));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::invalid(job, "poll_interval_secs must be positive"));
        }
        if self.position_file.as_os_str().is_empty() {
            return Err(ConfigError::invalid(job, "position_file is empty"));
        }

        let selectors = &self.content_selector;
        for (field, element) in [
            ("list_item", &selectors.list_item),
            ("id", &selectors.id),
            ("content", &selectors.content),
            ("url", &selectors.url),
        ] {
            if element.extract_type == ExtractType::Attr && element.attr.is_empty() {
                return Err(ConfigError::invalid(
                    job,
                    format!("{field} selector extracts an attribute but names none"),
                ));
            }
        }
        CompiledSelectors::compile(selectors)
            .map_err(|err| ConfigError::invalid(job, err.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub fetch: FetchSettings,
    pub jobs: Vec<ScrapeJobConfig>,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        let mut positions = HashSet::new();
        for job in &self.jobs {
            job.validate()?;
            if !names.insert(job.job.as_str()) {
                return Err(ConfigError::invalid(&job.job, "duplicate job name"));
            }
            // One writer per watermark file.
            if !positions.insert(job.position_file.as_path()) {
                return Err(ConfigError::invalid(
                    &job.job,
                    format!("position_file {:?} is shared with another job", job.position_file),
                ));
            }
        }
        Ok(())
    }
}
