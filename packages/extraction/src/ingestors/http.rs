//! HTTP-based document fetcher.
//!
//! Filing hosts sometimes refuse requests that don't look like a browser, so
//! a 403 on the first attempt is retried once with a second header set.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, REFERER, USER_AGENT};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{FetchError, FetchResult};
use crate::traits::document::DocumentFetcher;

const PRIMARY_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const ALTERNATE_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15";
const PDF_ACCEPT: &str = "application/pdf,application/octet-stream,*/*";
const DEFAULT_REFERER: &str = "https://projects.propublica.org/nonprofits/";

/// Magic bytes every PDF starts with.
const PDF_SIGNATURE: &[u8] = b"%PDF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderSet {
    Primary,
    Alternate,
}

/// Downloads filing PDFs over HTTP.
pub struct HttpDocumentFetcher {
    client: reqwest::Client,
    referer: String,
}

impl Default for HttpDocumentFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpDocumentFetcher {
    /// Create a fetcher with a 30 second per-request timeout.
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            referer: DEFAULT_REFERER.to_string(),
        }
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    async fn send(&self, url: &str, headers: HeaderSet) -> FetchResult<reqwest::Response> {
        let request = match headers {
            HeaderSet::Primary => self
                .client
                .get(url)
                .header(USER_AGENT, PRIMARY_USER_AGENT)
                .header(ACCEPT, PDF_ACCEPT)
                .header(REFERER, &self.referer),
            HeaderSet::Alternate => self
                .client
                .get(url)
                .header(USER_AGENT, ALTERNATE_USER_AGENT)
                .header(ACCEPT, "*/*"),
        };

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Http(e.to_string())
            }
        })
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<Vec<u8>> {
        let mut response = self.send(url, HeaderSet::Primary).await?;

        if response.status() == StatusCode::FORBIDDEN {
            debug!(url = %url, "Download forbidden, retrying with alternate headers");
            response = self.send(url, HeaderSet::Alternate).await?;
        }

        check_status(url, response.status())?;

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Http(e.to_string())
            }
        })?;

        check_pdf_signature(url, &body)?;
        debug!(url = %url, bytes = body.len(), "Downloaded filing document");

        Ok(body.to_vec())
    }
}

/// Map a final response status onto the fetch error taxonomy.
fn check_status(url: &str, status: StatusCode) -> FetchResult<()> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::FORBIDDEN => {
            warn!(url = %url, "Download forbidden after header retry");
            Err(FetchError::Forbidden {
                url: url.to_string(),
            })
        }
        StatusCode::TOO_MANY_REQUESTS => Err(FetchError::RateLimited {
            url: url.to_string(),
        }),
        s => Err(FetchError::Status {
            url: url.to_string(),
            status: s.as_u16(),
        }),
    }
}

/// Reject bodies that aren't PDFs (HTML error pages, captcha walls).
pub(crate) fn check_pdf_signature(url: &str, body: &[u8]) -> FetchResult<()> {
    if body.starts_with(PDF_SIGNATURE) {
        Ok(())
    } else {
        Err(FetchError::NotPdf {
            url: url.to_string(),
        })
    }
}
