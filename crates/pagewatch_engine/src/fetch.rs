use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::decode::decode_html;
use crate::{Document, FailureKind, FetchError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            user_agent: concat!("pagewatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Fetches one listing page and hands back a parsed document.
///
/// Implementations only classify failures; retry policy belongs to the
/// caller.
#[async_trait::async_trait]
pub trait DocumentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Document, FetchError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(settings.connect_timeout_ms))
            .timeout(Duration::from_millis(settings.request_timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self { client, settings })
    }

    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }
}

#[async_trait::async_trait]
impl DocumentFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::fatal(FailureKind::InvalidUrl, err.to_string()))?;

        let response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        check_status(response.status())?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        check_content_type(content_type.as_deref())?;

        let max_bytes = self.settings.max_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(FetchError::fatal(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "response too large",
                ));
            }
        }

        let final_url = response.url().to_string();
        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(FetchError::fatal(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "response too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }

        let tld = parsed.domain().and_then(|domain| domain.rsplit('.').next());
        let decoded = decode_html(&bytes, content_type.as_deref(), tld);
        if decoded.had_errors {
            log::warn!(
                "Replaced malformed bytes while decoding {} as {}",
                final_url,
                decoded.encoding_label
            );
        }

        Ok(Document::parse(
            final_url,
            &decoded.html,
            decoded.encoding_label,
        ))
    }
}

/// 5xx is transient; any other non-2xx status points at configuration or a
/// resource that is gone.
fn check_status(status: StatusCode) -> Result<(), FetchError> {
    let code = status.as_u16();
    if status.is_server_error() {
        return Err(FetchError::retryable(
            FailureKind::HttpStatus(code),
            status.to_string(),
        ));
    }
    if code >= 300 {
        return Err(FetchError::fatal(
            FailureKind::HttpStatus(code),
            status.to_string(),
        ));
    }
    Ok(())
}

fn check_content_type(content_type: Option<&str>) -> Result<(), FetchError> {
    let ct = content_type.unwrap_or_default();
    if ct.to_ascii_lowercase().contains("text/html") {
        return Ok(());
    }
    Err(FetchError::fatal(
        FailureKind::UnsupportedContentType {
            content_type: ct.to_string(),
        },
        "expected text/html",
    ))
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::retryable(FailureKind::Timeout, err.to_string());
    }
    if err.is_redirect() {
        return FetchError::fatal(FailureKind::RedirectLimitExceeded, err.to_string());
    }
    if err.is_builder() {
        return FetchError::fatal(FailureKind::InvalidUrl, err.to_string());
    }
    FetchError::retryable(FailureKind::Network, err.to_string())
}
