use std::sync::Arc;

use pagewatch_logging::{job_error, job_info, job_warn};
use tokio_util::sync::CancellationToken;

use crate::config::ScrapeJobConfig;
use crate::extract::{ContentExtractor, Extraction, SelectorError};
use crate::fetch::DocumentFetcher;
use crate::position::PositionStore;
use crate::{ContentRecord, FetchError, FetchFailure};

/// Ways a pagination pass can fail. Both end the job.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CycleError {
    #[error("fetching {url} failed: {failure}")]
    Fetch { url: String, failure: FetchFailure },
    #[error("no items found on page {page} ({url}); check the content selectors")]
    NoItemsFound { url: String, page: u32 },
}

/// One pagination pass of a job, from the newest page towards the oldest,
/// stopping at the first item already seen.
pub struct ScrapeCycle {
    config: ScrapeJobConfig,
    fetcher: Arc<dyn DocumentFetcher>,
    extractor: ContentExtractor,
    position: PositionStore,
}

impl ScrapeCycle {
    pub fn new(
        config: ScrapeJobConfig,
        fetcher: Arc<dyn DocumentFetcher>,
    ) -> Result<Self, SelectorError> {
        let extractor = ContentExtractor::for_job(&config)?;
        let position = PositionStore::new(config.position_file.clone());
        Ok(Self {
            config,
            fetcher,
            extractor,
            position,
        })
    }

    pub fn job(&self) -> &str {
        &self.config.job
    }

    pub fn config(&self) -> &ScrapeJobConfig {
        &self.config
    }

    pub fn position(&self) -> &PositionStore {
        &self.position
    }

    /// Walk the configured pages and return every new record, newest first.
    ///
    /// A retryable fetch failure or cancellation ends the pass with no
    /// records and leaves the watermark untouched. The watermark is saved
    /// only when the first page yielded a record.
    pub async fn run(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Vec<ContentRecord>, CycleError> {
        let job = self.config.job.as_str();
        let start = self.config.start_page_offset;
        let limit = self.config.page_offset_limit;
        let watermark = self.position.read();
        job_info!(job, "Starting cycle over pages {}..={} (watermark {:?})", start, limit, watermark);

        let mut records = Vec::new();
        let mut new_watermark: Option<String> = None;
        let mut pages = 0u32;

        for page in start..=limit {
            let url = self.config.page_url(page);
            job_info!(job, "Fetching page {}: {}", page, url);

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    job_info!(job, "Cancelled while fetching {}", url);
                    return Ok(Vec::new());
                }
                fetched = self.fetcher.fetch(&url) => fetched,
            };
            pages += 1;

            let Extraction {
                records: page_records,
                hit_watermark,
            } = match fetched {
                Ok(document) => self.extractor.extract(&document, &watermark),
                Err(FetchError::Retryable(failure)) => {
                    job_warn!(job, "Transient failure on {}, retrying next tick: {}", url, failure);
                    return Ok(Vec::new());
                }
                Err(FetchError::Fatal(failure)) => {
                    job_error!(job, "Fatal failure on {}: {}", url, failure);
                    return Err(CycleError::Fetch { url, failure });
                }
            };

            if page == start {
                new_watermark = page_records.first().map(|record| record.id.clone());
            }

            if page_records.is_empty() {
                if hit_watermark {
                    job_info!(job, "No new content on page {}", page);
                    break;
                }
                job_error!(job, "Selectors matched nothing usable on {}", url);
                return Err(CycleError::NoItemsFound { url, page });
            }

            records.extend(page_records);
            if hit_watermark {
                break;
            }
        }

        if let Some(id) = new_watermark {
            if let Err(err) = self.position.save(&id) {
                job_error!(
                    job,
                    "Failed to save watermark {:?} to {:?}: {}",
                    id,
                    self.position.path(),
                    err
                );
            }
        }

        job_info!(job, "Cycle finished: {} new records from {} pages", records.len(), pages);
        Ok(records)
    }
}
