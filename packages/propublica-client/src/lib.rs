//! Pure ProPublica Nonprofit Explorer REST API client.
//!
//! A minimal client for the v2 API. Supports paginated organization search
//! and organization detail (filing history) lookups.
//!
//! # Example
//!
//! ```rust,ignore
//! use propublica_client::{ProPublicaClient, SearchParams};
//!
//! let client = ProPublicaClient::new();
//!
//! let page = client.search(&SearchParams::new("foundation", "CT", 0)).await?;
//! for org in &page.organizations {
//!     let detail = client.organization(org.ein).await?;
//!     println!("{} has {} structured filings", detail.organization.name, detail.filings_with_data.len());
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{ProPublicaError, Result};
pub use types::{
    FilingWithData, FilingWithoutData, OrganizationInfo, OrganizationResponse,
    OrganizationSummary, SearchParams, SearchResponse,
};

use std::time::Duration;

const BASE_URL: &str = "https://projects.propublica.org/nonprofits/api/v2";

#[derive(Clone)]
pub struct ProPublicaClient {
    client: reqwest::Client,
    base_url: String,
}

impl Default for ProPublicaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ProPublicaClient {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(10))
    }

    /// Client whose every request carries the given timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Point the client at another host (test servers, mirrors).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one page of search results.
    ///
    /// The registry answers 404 for a page past the end of the result set;
    /// that surfaces as [`ProPublicaError::NotFound`].
    pub async fn search(&self, params: &SearchParams) -> Result<SearchResponse> {
        let url = self.search_url(params);
        tracing::debug!(query = %params.query, page = params.page, "registry search");

        let resp = check_response(self.client.get(&url).send().await?).await?;
        Ok(resp.json().await?)
    }

    /// Fetch an organization's profile and filing history.
    pub async fn organization(&self, ein: u64) -> Result<OrganizationResponse> {
        let url = format!("{}/organizations/{}.json", self.base_url, ein);
        tracing::debug!(ein, "registry organization lookup");

        let resp = check_response(self.client.get(&url).send().await?).await?;
        Ok(resp.json().await?)
    }

    fn search_url(&self, params: &SearchParams) -> String {
        format!(
            "{}/search.json?q={}&state%5Bid%5D={}&c_code%5Bid%5D={}&page={}",
            self.base_url,
            urlencoding::encode(&params.query),
            urlencoding::encode(&params.state),
            params.category,
            params.page
        )
    }
}

/// Map an HTTP response onto the client's error taxonomy.
///
/// - **404** → [`ProPublicaError::NotFound`]
/// - **429** → [`ProPublicaError::RateLimited`], honouring `Retry-After`
///   (60 s when absent or unparseable)
/// - any other non-success → [`ProPublicaError::Api`]
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(ProPublicaError::NotFound);
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ProPublicaError::RateLimited {
            retry_after_secs: parse_retry_after(&resp),
        });
    }
    if !status.is_success() {
        return Err(ProPublicaError::Api {
            status: status.as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

fn parse_retry_after(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(60)
}
