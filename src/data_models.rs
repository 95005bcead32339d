use serde::{Deserialize, Serialize};

/// One inbound query. `count` stays signed so that non-positive requests can be
/// answered with an empty result set instead of a decoding error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub count: i64,
}

impl Query {
    pub fn new(text: impl Into<String>, count: i64) -> Query {
        Query {
            text: text.into(),
            count,
        }
    }

    /// Requested number of results, or `None` when nothing should be searched.
    pub fn wanted(&self) -> Option<usize> {
        usize::try_from(self.count).ok().filter(|n| *n > 0)
    }
}

/// A URL proposed by a search backend, in the backend's rank order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub url: String,
    pub title: String,
    pub snippet: Option<String>,
}

impl Candidate {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Candidate {
        Candidate {
            url: url.into(),
            title: title.into(),
            snippet: None,
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Candidate {
        let snippet = snippet.into();
        // backends report a missing description as ""
        self.snippet = if snippet.trim().is_empty() {
            None
        } else {
            Some(snippet)
        };
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: Option<String>,
    pub text: String,
}

/// The record handed back to the dialog agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub url: String,
    pub title: String,
    pub content: String,
}

pub type ResultSet = Vec<ResultRecord>;
