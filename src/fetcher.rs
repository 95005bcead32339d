//! Single-page HTTP GET with a per-call timeout, a body size cap, and
//! charset detection.

use std::time::Duration;

use async_trait::async_trait;
use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use reqwest::{Client, header::CONTENT_TYPE};
use tracing::debug;

use crate::error::{ConfigError, FetchError};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Bodies past this size are cut off; the extracted text is capped much
/// lower anyway.
pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// How far into the body a `<meta charset>` declaration is looked for.
const META_SNIFF_BYTES: usize = 1024;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; parlai-search-server/0.1)";

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches the decoded body of `url`. Every failure is local to that url.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError>;
}

/// reqwest-backed fetcher. The client (and its connection pool) is shared by
/// all queries; nothing else is.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, ConfigError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

fn body_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Body {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        // the timeout covers connect, headers and body
        let mut res = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let header_charset = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset_param)
            .map(str::to_owned);

        let mut body = Vec::new();
        while let Some(chunk) = res.chunk().await.map_err(|e| body_error(url, e))? {
            let room = self.max_body_bytes - body.len();
            if chunk.len() > room {
                body.extend_from_slice(&chunk[..room]);
                debug!(url, limit = self.max_body_bytes, "body truncated");
                break;
            }
            body.extend_from_slice(&chunk);
        }

        let text = decode_body(&body, header_charset.as_deref());
        debug!(url, bytes = body.len(), "fetched page");
        Ok(text)
    }
}

/// Decodes a page body. The charset comes from the Content-Type header, then
/// from a `<meta>` declaration near the top of the page, and is otherwise
/// guessed from the bytes. A byte order mark overrides all three.
pub fn decode_body(body: &[u8], header_charset: Option<&str>) -> String {
    let encoding = header_charset
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .or_else(|| meta_charset(body))
        .unwrap_or_else(|| {
            let mut detector = EncodingDetector::new();
            detector.feed(body, true);
            detector.guess(None, true)
        });
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}

fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then_some(value.trim().trim_matches('"'))
    })
}

/// Finds `charset=<label>` in the head of the page, which covers both
/// `<meta charset=..>` and the `http-equiv` form.
fn meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    const NEEDLE: &[u8] = b"charset=";

    let head = body[..body.len().min(META_SNIFF_BYTES)].to_ascii_lowercase();
    let mut from = 0;
    while let Some(pos) = head[from..].windows(NEEDLE.len()).position(|w| w == NEEDLE) {
        let start = from + pos + NEEDLE.len();
        let rest = match head[start..].first() {
            Some(b'"' | b'\'') => &head[start + 1..],
            _ => &head[start..],
        };
        let end = rest
            .iter()
            .position(|b| matches!(b, b'"' | b'\'' | b';' | b'>' | b'/') || b.is_ascii_whitespace())
            .unwrap_or(rest.len());
        if let Some(encoding) = Encoding::for_label(&rest[..end]) {
            return Some(encoding);
        }
        from = start;
    }
    None
}
