//! Search backends
//!
//! Every engine sits behind [`SearchBackend`]. The retriever only sees the
//! trait, so adding an engine means adding a module here and a match arm in
//! [`build_backend`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{EngineConfig, ServerConfig};
use crate::data_models::Candidate;
use crate::error::{ConfigError, SearchError};

pub mod aquila;
pub mod bing;
pub mod google;

pub use aquila::AquilaBackend;
pub use bing::BingBackend;
pub use google::GoogleScrapeBackend;

#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns up to `count` candidates in the engine's rank order. A `count`
    /// of zero yields an empty list without contacting the engine.
    async fn search(&self, query: &str, count: usize) -> Result<Vec<Candidate>, SearchError>;

    /// When true, candidates that carry a snippet are answered with it
    /// instead of fetching the page.
    fn description_only(&self) -> bool {
        false
    }
}

/// Builds the backend selected by `config`, sharing its search timeout.
pub fn build_backend(config: &ServerConfig) -> Result<Arc<dyn SearchBackend>, ConfigError> {
    let timeout = config.search_timeout;
    let backend: Arc<dyn SearchBackend> = match &config.engine {
        EngineConfig::Google => Arc::new(GoogleScrapeBackend::new(timeout)?),
        EngineConfig::Bing {
            subscription_key,
            use_description_only,
        } => Arc::new(
            BingBackend::new(subscription_key.clone(), timeout)?
                .with_description_only(*use_description_only),
        ),
        EngineConfig::Aquila { index_id, url } => {
            Arc::new(AquilaBackend::new(index_id.clone(), timeout)?.with_endpoint(url.clone()))
        }
    };
    Ok(backend)
}

pub(crate) fn http_client(user_agent: &str, timeout: Duration) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(ConfigError::HttpClient)
}

/// Maps transport failures of a backend call.
pub(crate) fn unavailable(backend: &'static str, e: reqwest::Error) -> SearchError {
    if e.is_timeout() {
        SearchError::unavailable(backend, "request timed out")
    } else {
        SearchError::unavailable(backend, e)
    }
}
