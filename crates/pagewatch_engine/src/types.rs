use std::fmt;

use scraper::Html;

/// One item extracted from a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRecord {
    pub id: String,
    pub body: String,
    pub url: String,
}

/// Records produced by one successful cycle of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBatch {
    pub job: String,
    pub records: Vec<ContentRecord>,
}

/// A fetched, decoded and parsed listing page.
///
/// The parsed tree is not `Send`; keep a `Document` out of scope across
/// `.await` points.
pub struct Document {
    url: String,
    encoding_label: String,
    html: Html,
}

impl Document {
    pub fn parse(url: impl Into<String>, source: &str, encoding_label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            encoding_label: encoding_label.into(),
            html: Html::parse_document(source),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn encoding_label(&self) -> &str {
        &self.encoding_label
    }

    pub fn html(&self) -> &Html {
        &self.html
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("url", &self.url)
            .field("encoding_label", &self.encoding_label)
            .finish_non_exhaustive()
    }
}

/// Fetch failure classified by whether the next tick may succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("retryable fetch failure: {0}")]
    Retryable(FetchFailure),
    #[error("fatal fetch failure: {0}")]
    Fatal(FetchFailure),
}

impl FetchError {
    pub(crate) fn retryable(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Retryable(FetchFailure::new(kind, message))
    }

    pub(crate) fn fatal(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Fatal(FetchFailure::new(kind, message))
    }

    pub fn failure(&self) -> &FetchFailure {
        match self {
            FetchError::Retryable(failure) | FetchError::Fatal(failure) => failure,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Retryable(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchFailure {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type:?}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    Stopped,
    Terminated,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobState::Idle => "idle",
            JobState::Running => "running",
            JobState::Stopped => "stopped",
            JobState::Terminated => "terminated",
        };
        f.write_str(label)
    }
}
