//! Pagewatch engine: incremental scraping of paginated listing pages.
mod config;
mod cycle;
mod decode;
mod extract;
mod fetch;
mod position;
mod runner;
mod sink;
mod types;

pub use config::{
    AppConfig, ConfigError, ContentSelector, ElementSelector, ExtractType, ScrapeJobConfig,
    PAGE_PLACEHOLDER,
};
pub use cycle::{CycleError, ScrapeCycle};
pub use decode::{decode_html, DecodedHtml};
pub use extract::{site_origin, CompiledSelectors, ContentExtractor, Extraction, SelectorError};
pub use fetch::{DocumentFetcher, FetchSettings, ReqwestFetcher};
pub use position::{PositionError, PositionStore};
pub use runner::{JobExit, JobRunner};
pub use sink::{ChannelRecordSink, LogRecordSink, RecordSink};
pub use types::{
    ContentRecord, Document, FailureKind, FetchError, FetchFailure, JobState, RecordBatch,
};
