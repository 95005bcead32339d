use serde::{Deserialize, Serialize};

use crate::data_models::ResultRecord;

/// Form body sent by the dialog agent: `q=<text>&n=<count>`.
///
/// Missing fields decode as empty so the handler rejects them with the
/// usual response shape.
#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub n: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub response: Vec<ResultRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResponse {
    pub fn ok(response: Vec<ResultRecord>) -> Self {
        Self {
            response,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            response: Vec::new(),
            error: Some(error.into()),
        }
    }
}
