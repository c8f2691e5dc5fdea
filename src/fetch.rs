// src/fetch.rs
//! Page acquisition: a browser-like header set, bounded retries with
//! exponential backoff, and charset repair for bodies whose declared
//! encoding is missing or wrong.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, REFERER};
use reqwest::redirect::Policy;
use thiserror::Error;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";
pub const DEFAULT_TIMEOUT_SECS: u64 = 25;

const ACCEPT_HTML: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const REFERER_URL: &str = "https://www.google.com/";
const MAX_REDIRECTS: usize = 8;

/// Retry policy: transient statuses and transport failures share one budget.
const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];
const MAX_RETRIES: u32 = 3;
const BACKOFF_BASE_MS: u64 = 600;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {status}")]
    Http { status: u16 },
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http { status } => RETRY_STATUSES.contains(status),
            FetchError::Timeout | FetchError::Network(_) => true,
        }
    }

    /// The one status the orchestrator routes to the archive tier.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, FetchError::Http { status: 403 })
    }
}

/// One raw HTTP exchange, body still undecoded.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Seam between the pipeline and the network. The real implementation wraps
/// a shared reqwest client; tests substitute scripted fakes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<RawResponse, FetchError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str, accept_language: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_str(accept_language)?);
        headers.insert(REFERER, HeaderValue::from_static(REFERER_URL));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        headers.insert("dnt", HeaderValue::from_static("1"));
        headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<RawResponse, FetchError> {
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;
        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await.map_err(classify)?.to_vec();
        Ok(RawResponse {
            status,
            final_url,
            content_type,
            body,
        })
    }
}

fn classify(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(e.to_string())
    }
}

/// A successfully fetched, decoded page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub final_url: String,
    pub status: u16,
    pub body: String,
}

pub struct PageClient {
    transport: Arc<dyn Transport>,
    timeout: Duration,
    backoff_base: Duration,
}

impl PageClient {
    pub fn new(transport: Arc<dyn Transport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            backoff_base: Duration::from_millis(BACKOFF_BASE_MS),
        }
    }

    /// Optional builder for tests/tools.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let mut attempt = 0u32;
        loop {
            let error = match self.transport.get(url, self.timeout).await {
                Ok(resp) if (200..300).contains(&resp.status) => {
                    let body = decode_body(&resp.body, resp.content_type.as_deref());
                    tracing::debug!(url = %url, final_url = %resp.final_url, "page fetched");
                    return Ok(FetchedPage {
                        final_url: resp.final_url,
                        status: resp.status,
                        body,
                    });
                }
                Ok(resp) => FetchError::Http {
                    status: resp.status,
                },
                Err(e) => e,
            };
            if attempt >= MAX_RETRIES || !error.is_retryable() {
                return Err(error);
            }
            attempt += 1;
            let delay = self.backoff_base * 2u32.pow(attempt - 1);
            tracing::debug!(
                url = %url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "retrying fetch"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

static RE_META_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)charset\s*=\s*["']?\s*([A-Za-z0-9_\-]+)"#).expect("charset pattern"));

/// Decode order: BOM, `<meta charset>` in the byte prefix, the header
/// charset, UTF-8 (lossy). Body evidence outranks the header.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        let (text, _, _) = encoding.decode(bytes);
        return text.into_owned();
    }
    if let Some(encoding) = sniff_meta_charset(bytes) {
        let (text, _, _) = encoding.decode(bytes);
        return text.into_owned();
    }
    if let Some(encoding) = content_type.and_then(charset_from_content_type) {
        let (text, _, _) = encoding.decode(bytes);
        return text.into_owned();
    }
    String::from_utf8_lossy(bytes).into_owned()
}

fn sniff_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(1024)];
    let head = String::from_utf8_lossy(head);
    let label = RE_META_CHARSET.captures(&head)?.get(1)?.as_str();
    Encoding::for_label(label.trim().as_bytes())
}

fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    let lower = content_type.to_ascii_lowercase();
    let idx = lower.find("charset=")?;
    let rest = &content_type[idx + "charset=".len()..];
    let label = rest
        .split([';', ' ', '\t'])
        .next()?
        .trim_matches('"');
    Encoding::for_label(label.as_bytes())
}
