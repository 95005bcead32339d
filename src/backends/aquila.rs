//! Aquila Network index backend.
//!
//! The index answers with a map of url to relevance score and carries neither
//! titles nor descriptions, so every candidate goes through the fetcher.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{SearchBackend, http_client, unavailable};
use crate::config::DEFAULT_AQUILA_URL;
use crate::data_models::Candidate;
use crate::error::{ConfigError, SearchError};

pub struct AquilaBackend {
    index_id: String,
    endpoint: String,
    client: Client,
}

impl AquilaBackend {
    pub fn new(index_id: String, timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            index_id,
            endpoint: DEFAULT_AQUILA_URL.to_string(),
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
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AquilaRequest<'a> {
    public_index_id: &'a str,
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct AquilaResponse {
    result: HashMap<String, f64>,
}

/// Highest score first; ties broken by url so the order is stable.
fn rank(result: HashMap<String, f64>, count: usize) -> Vec<Candidate> {
    let mut scored: Vec<(String, f64)> = result.into_iter().collect();
    scored.sort_by(|(url_a, a), (url_b, b)| b.total_cmp(a).then_with(|| url_a.cmp(url_b)));
    scored
        .into_iter()
        .take(count)
        .map(|(url, _)| Candidate::new(url, ""))
        .collect()
}

#[async_trait]
impl SearchBackend for AquilaBackend {
    fn name(&self) -> &'static str {
        "aquila"
    }

    async fn search(&self, query: &str, count: usize) -> Result<Vec<Candidate>, SearchError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let res = self
            .client
            .post(&self.endpoint)
            .json(&AquilaRequest {
                public_index_id: &self.index_id,
                query,
            })
            .send()
            .await
            .map_err(|e| unavailable(self.name(), e))?;

        let status = res.status();
        if !status.is_success() {
            return Err(SearchError::unavailable(self.name(), format!("status {status}")));
        }

        let data: AquilaResponse = res
            .json()
            .await
            .map_err(|e| SearchError::unavailable(self.name(), format!("malformed response: {e}")))?;

        Ok(rank(data.result, count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_orders_by_descending_score() {
        let result = HashMap::from([
            ("https://low.test".to_string(), 0.1),
            ("https://high.test".to_string(), 0.9),
            ("https://mid.test".to_string(), 0.5),
        ]);
        let urls: Vec<String> = rank(result, 2).into_iter().map(|c| c.url).collect();
        assert_eq!(urls, vec!["https://high.test", "https://mid.test"]);
    }

    #[test]
    fn test_request_uses_camel_case() {
        let body = serde_json::to_value(AquilaRequest {
            public_index_id: "idx",
            query: "baseball",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"publicIndexId": "idx", "query": "baseball"}));
    }
}
