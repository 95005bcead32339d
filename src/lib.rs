//! Web search server for retrieval-augmented dialog agents.
//!
//! A query and a result count come in over HTTP, a pluggable search backend
//! proposes candidate urls, each page is fetched and flattened to text, and a
//! list of `(url, title, content)` records goes back out.

pub mod api;
pub mod backends;
pub mod config;
pub mod data_models;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod retriever;
