//! Google result-page scraper.
//!
//! No API and no snippets: the listing is fetched page by page and the ranked
//! result anchors are recovered from the HTML. Slow by nature (one round trip
//! per listing page plus a pause between pages), which is fine for interactive
//! use but not for bulk querying.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use tracing::{debug, warn};

use super::{SearchBackend, http_client, unavailable};
use crate::data_models::Candidate;
use crate::error::{ConfigError, SearchError};

pub const GOOGLE_SEARCH_URL: &str = "https://www.google.com/search";

const PAGE_SIZE: usize = 10;
const MAX_PAGES: usize = 5;
/// Querying faster than this gets the client banned.
const PAGE_PAUSE: Duration = Duration::from_secs(1);

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h3").expect("static selector"));

pub struct GoogleScrapeBackend {
    endpoint: String,
    page_pause: Duration,
    client: Client,
}

impl GoogleScrapeBackend {
    pub fn new(timeout: Duration) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: GOOGLE_SEARCH_URL.to_string(),
            page_pause: PAGE_PAUSE,
            client: http_client(BROWSER_USER_AGENT, timeout)?,
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

    pub fn with_page_pause(mut self, pause: Duration) -> Self {
        self.page_pause = pause;
        self
    }

    async fn fetch_listing(&self, query: &str, num: usize, start: usize) -> Result<String, SearchError> {
        let num = num.to_string();
        let start = start.to_string();
        let res = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("num", num.as_str()),
                ("start", start.as_str()),
                ("hl", "en"),
            ])
            .send()
            .await
            .map_err(|e| unavailable(self.name(), e))?;

        let status = res.status();
        if !status.is_success() {
            return Err(SearchError::unavailable(self.name(), format!("status {status}")));
        }
        res.text().await.map_err(|e| unavailable(self.name(), e))
    }
}

/// Extracts `(url, title)` pairs, in page order, from one result listing.
pub fn parse_listing(html: &str, base: &Url) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    let mut out = Vec::new();

    for anchor in document.select(&LINK_SELECTOR) {
        // organic results carry their title in an <h3> inside the anchor
        let Some(heading) = anchor.select(&TITLE_SELECTOR).next() else {
            continue;
        };
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_result_url(href, base) else {
            continue;
        };
        let title = heading
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        out.push(Candidate::new(url, title));
    }
    out
}

fn resolve_result_url(href: &str, base: &Url) -> Option<String> {
    let mut link = base.join(href).ok()?;

    // redirect links look like /url?q=<target>&sa=...
    if link.path() == "/url" {
        let target = link
            .query_pairs()
            .find(|(k, _)| k == "q" || k == "url")
            .map(|(_, v)| v.into_owned())?;
        link = Url::parse(&target).ok()?;
    }

    if link.scheme() != "http" && link.scheme() != "https" {
        return None;
    }
    let host = link.host_str()?;
    if is_google_host(host) || Some(host) == base.host_str() {
        return None;
    }
    Some(link.to_string())
}

fn is_google_host(host: &str) -> bool {
    host.split('.').any(|label| label == "google") || host.ends_with("googleusercontent.com")
}

#[async_trait]
impl SearchBackend for GoogleScrapeBackend {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn search(&self, query: &str, count: usize) -> Result<Vec<Candidate>, SearchError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let base = Url::parse(&self.endpoint)
            .map_err(|e| SearchError::unavailable(self.name(), format!("bad endpoint: {e}")))?;

        let num = count.max(PAGE_SIZE).min(100);
        let max_pages = (count.div_ceil(num) + 1).min(MAX_PAGES);
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        for page in 0..max_pages {
            if page > 0 {
                tokio::time::sleep(self.page_pause).await;
            }

            let html = match self.fetch_listing(query, num, page * num).await {
                Ok(html) => html,
                Err(e) if page == 0 => return Err(e),
                Err(e) => {
                    warn!("stopping after {page} listing pages: {e}");
                    break;
                }
            };

            let mut fresh = 0usize;
            for candidate in parse_listing(&html, &base) {
                if candidates.len() >= count {
                    break;
                }
                if seen.insert(candidate.url.clone()) {
                    candidates.push(candidate);
                    fresh += 1;
                }
            }
            debug!(page, fresh, total = candidates.len(), "parsed listing page");

            if candidates.len() >= count || fresh == 0 {
                break;
            }
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
        <div id="search">
          <div class="g"><a href="/url?q=https://en.wikipedia.org/wiki/Baseball&amp;sa=U&amp;ved=x"><h3>Baseball - Wikipedia</h3></a></div>
          <div class="g"><a href="https://www.mlb.com/"><h3>MLB.com  |  The
              Official Site</h3></a></div>
          <div class="g"><a href="https://maps.google.com/maps?q=baseball"><h3>Maps</h3></a></div>
          <div class="g"><a href="/search?q=baseball+rules"><h3>Related search</h3></a></div>
          <a href="https://www.espn.com/mlb/">ESPN without heading</a>
          <div class="g"><a href="javascript:void(0)"><h3>Script link</h3></a></div>
        </div>
        </body></html>
    "#;

    fn base() -> Url {
        Url::parse(GOOGLE_SEARCH_URL).unwrap()
    }

    #[test]
    fn test_parse_listing_keeps_rank_order() {
        let candidates = parse_listing(LISTING, &base());
        let urls: Vec<&str> = candidates.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://en.wikipedia.org/wiki/Baseball", "https://www.mlb.com/"]
        );
    }

    #[test]
    fn test_parse_listing_titles_and_no_snippets() {
        let candidates = parse_listing(LISTING, &base());
        assert_eq!(candidates[0].title, "Baseball - Wikipedia");
        assert_eq!(candidates[1].title, "MLB.com | The Official Site");
        assert!(candidates.iter().all(|c| c.snippet.is_none()));
    }

    #[test]
    fn test_parse_empty_listing() {
        assert!(parse_listing("", &base()).is_empty());
        assert!(parse_listing("<html><p>no results</p></html>", &base()).is_empty());
    }

    #[test]
    fn test_google_hosts() {
        assert!(is_google_host("www.google.com"));
        assert!(is_google_host("maps.google.co.uk"));
        assert!(is_google_host("webcache.googleusercontent.com"));
        assert!(!is_google_host("googleblog.example.com"));
        assert!(!is_google_host("en.wikipedia.org"));
    }
}
