//! Bing Web Search API (v7) backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{SearchBackend, http_client, unavailable};
use crate::data_models::Candidate;
use crate::error::{ConfigError, SearchError};

pub const BING_API_URL: &str = "https://api.bing.microsoft.com/v7.0/search";

/// The API refuses larger pages.
const MAX_COUNT: usize = 50;

pub struct BingBackend {
    subscription_key: String,
    endpoint: String,
    description_only: bool,
    client: Client,
}

impl BingBackend {
    pub fn new(subscription_key: String, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            subscription_key,
            endpoint: BING_API_URL.to_string(),
            description_only: false,
            client: http_client("parlai-search-server/0.1", timeout)?,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_description_only(mut self, description_only: bool) -> Self {
        self.description_only = description_only;
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingResponse {
    web_pages: Option<BingWebPages>,
}

#[derive(Debug, Deserialize)]
struct BingWebPages {
    value: Vec<BingResult>,
}

#[derive(Debug, Deserialize)]
struct BingResult {
    name: String,
    url: String,
    #[serde(default)]
    snippet: String,
}

#[async_trait]
impl SearchBackend for BingBackend {
    fn name(&self) -> &'static str {
        "bing"
    }

    fn description_only(&self) -> bool {
        self.description_only
    }

    async fn search(&self, query: &str, count: usize) -> Result<Vec<Candidate>, SearchError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let count_param = count.min(MAX_COUNT).to_string();
        let res = self
            .client
            .get(&self.endpoint)
            .header("Ocp-Apim-Subscription-Key", &self.subscription_key)
            .query(&[
                ("q", query),
                ("count", count_param.as_str()),
                ("responseFilter", "Webpages"),
                ("textFormat", "Raw"),
            ])
            .send()
            .await
            .map_err(|e| unavailable(self.name(), e))?;

        let status = res.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SearchError::unavailable(
                self.name(),
                format!("subscription key rejected ({status})"),
            ));
        }
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SearchError::unavailable(
                self.name(),
                format!("status {status}: {body}"),
            ));
        }

        let data: BingResponse = res
            .json()
            .await
            .map_err(|e| SearchError::unavailable(self.name(), format!("malformed response: {e}")))?;

        Ok(data
            .web_pages
            .map(|pages| pages.value)
            .unwrap_or_default()
            .into_iter()
            .take(count)
            .map(|r| Candidate::new(r.url, r.name).with_snippet(r.snippet))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bing_response_deserialization() {
        let json = r#"{
            "_type": "SearchResponse",
            "webPages": {
                "totalEstimatedMatches": 2,
                "value": [
                    {"name": "Baseball - Wikipedia", "url": "https://en.wikipedia.org/wiki/Baseball", "snippet": "Baseball is a bat-and-ball sport."},
                    {"name": "MLB", "url": "https://www.mlb.com/"}
                ]
            }
        }"#;

        let response: BingResponse = serde_json::from_str(json).unwrap();
        let pages = response.web_pages.unwrap();
        assert_eq!(pages.value.len(), 2);
        assert_eq!(pages.value[0].name, "Baseball - Wikipedia");
        assert_eq!(pages.value[1].snippet, "");
    }

    #[test]
    fn test_bing_response_without_pages() {
        let response: BingResponse = serde_json::from_str("{}").unwrap();
        assert!(response.web_pages.is_none());
    }

    #[tokio::test]
    async fn test_zero_count_does_not_call_api() {
        let backend = BingBackend::new("key".into(), Duration::from_secs(1))
            .unwrap()
            .with_endpoint("http://127.0.0.1:9/unreachable");
        let candidates = backend.search("anything", 0).await.unwrap();
        assert!(candidates.is_empty());
    }
}
