use std::fmt;

use thiserror::Error;

/// Query-level failure: the search backend could not produce candidates.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("{backend} backend unavailable: {reason}")]
    BackendUnavailable {
        backend: &'static str,
        reason: String,
    },
}

impl SearchError {
    pub fn unavailable(backend: &'static str, reason: impl fmt::Display) -> Self {
        SearchError::BackendUnavailable {
            backend,
            reason: reason.to_string(),
        }
    }
}

/// Per-URL failure. Never escapes the retriever.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out fetching {url}")]
    Timeout { url: String },
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
    #[error("could not read body of {url}: {reason}")]
    Body { url: String, reason: String },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

/// Why a candidate was left out of the result set.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("no extractable text")]
    EmptyContent,
    #[error("content already returned for another url")]
    DuplicateContent,
}

/// Startup failure. The server never starts listening when one of these occurs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("search engine {engine} requires a subscription key (--subscription-key or SEARCH_API_KEY)")]
    MissingSubscriptionKey { engine: &'static str },
    #[error("invalid host `{0}`, expected HOSTNAME[:PORT]")]
    InvalidHost(String),
    #[error("max_text_bytes must be a positive integer")]
    InvalidMaxTextBytes,
    #[error("{name} must be a positive number of seconds, got {value}")]
    InvalidTimeout { name: &'static str, value: f64 },
    #[error("failed to build http client")]
    HttpClient(#[source] reqwest::Error),
}
