//! Query coordination: backend search, concurrent page resolution, and the
//! drop-and-continue policy for candidates that fail.

use std::collections::HashSet;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::backends::{SearchBackend, build_backend};
use crate::config::ServerConfig;
use crate::data_models::{Candidate, Query, ResultRecord, ResultSet};
use crate::error::{ConfigError, FetchError, SearchError, SkipReason};
use crate::extractor::HtmlExtractor;
use crate::fetcher::{HttpFetcher, PageFetcher};

/// What became of one candidate.
#[derive(Debug)]
pub enum CandidateOutcome {
    Resolved(ResultRecord),
    Skipped { url: String, reason: SkipReason },
}

pub struct Retriever {
    backend: Arc<dyn SearchBackend>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: HtmlExtractor,
    fetch_timeout: Duration,
    request_deadline: Option<Duration>,
}

impl Retriever {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: HtmlExtractor,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            fetcher,
            extractor,
            fetch_timeout,
            request_deadline: None,
        }
    }

    pub fn with_request_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.request_deadline = deadline;
        self
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, ConfigError> {
        let backend = build_backend(config)?;
        let fetcher = Arc::new(HttpFetcher::new()?);
        Ok(Self::new(
            backend,
            fetcher,
            HtmlExtractor::new(config.extract),
            config.fetch_timeout,
        )
        .with_request_deadline(config.request_deadline))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Resolves `query` into at most `query.count` records, in the backend's
    /// order. Candidates that fail are dropped, never replaced or padded; only
    /// a backend failure fails the query.
    pub async fn retrieve(&self, query: &Query) -> Result<ResultSet, SearchError> {
        let Some(wanted) = query.wanted() else {
            return Ok(Vec::new());
        };

        let candidates = self
            .backend
            .search(&query.text, wanted)
            .await
            .inspect_err(|e| warn!("search failed: {e}"))?;
        info!(
            backend = self.backend.name(),
            candidates = candidates.len(),
            "backend answered"
        );

        let description_only = self.backend.description_only();
        let deadline = self.request_deadline.map(|d| Instant::now() + d);

        // `buffered` runs up to `wanted` resolutions at once but yields them
        // in candidate order
        let mut outcomes = pin!(
            stream::iter(candidates)
                .map(|candidate| self.resolve(candidate, description_only))
                .buffered(wanted)
        );

        let mut records: ResultSet = Vec::with_capacity(wanted);
        let mut seen_content = HashSet::new();

        while records.len() < wanted {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, outcomes.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(returned = records.len(), "request deadline reached");
                        break;
                    }
                },
                None => outcomes.next().await,
            };
            let Some(outcome) = next else {
                break;
            };

            match outcome {
                CandidateOutcome::Resolved(record) if !seen_content.insert(record.content.clone()) => {
                    info!(url = %record.url, reason = %SkipReason::DuplicateContent, "excluding url");
                }
                CandidateOutcome::Resolved(record) => {
                    info!(url = %record.url, title = %record.title, "result");
                    records.push(record);
                }
                CandidateOutcome::Skipped { url, reason } => {
                    info!(url = %url, reason = %reason, "excluding url");
                }
            }
        }

        Ok(records)
    }

    /// Turns one candidate into a record, either from its snippet or by
    /// fetching and extracting the page.
    pub async fn resolve(&self, candidate: Candidate, description_only: bool) -> CandidateOutcome {
        let Candidate {
            url,
            title,
            snippet,
        } = candidate;

        if description_only {
            if let Some(content) = snippet {
                return CandidateOutcome::Resolved(ResultRecord {
                    url,
                    title,
                    content,
                });
            }
        }

        let fetched = tokio::time::timeout(
            self.fetch_timeout,
            self.fetcher.fetch(&url, self.fetch_timeout),
        )
        .await
        .unwrap_or_else(|_| Err(FetchError::Timeout { url: url.clone() }));

        let html = match fetched {
            Ok(html) => html,
            Err(e) => {
                return CandidateOutcome::Skipped {
                    url,
                    reason: e.into(),
                };
            }
        };

        let extracted = self.extractor.extract(&html);
        if extracted.text.trim().is_empty() {
            return CandidateOutcome::Skipped {
                url,
                reason: SkipReason::EmptyContent,
            };
        }

        CandidateOutcome::Resolved(ResultRecord {
            url,
            title: extracted.title.unwrap_or(title),
            content: extracted.text,
        })
    }
}
