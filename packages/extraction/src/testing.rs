//! Testing utilities including mock implementations.
//!
//! These are useful for testing the pipeline without making real registry,
//! download or AI calls. Every mock is cheap to clone; clones share state,
//! so a test can hand one clone to the pipeline and assert on another.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use crate::error::{
    AiError, AiResult, FetchError, FetchResult, RegistryError, RegistryResult, TextError,
    TextResult,
};
use crate::traits::{
    ai::{AiExtractor, AiFigures},
    document::DocumentFetcher,
    progress::ProgressSink,
    registry::{Registry, SearchPage},
    text::{RecoveredText, TextExtractor},
};
use crate::types::{
    organization::{Ein, Organization, OrganizationSummary},
    progress::ProgressSnapshot,
};

/// Minimal bytes that pass a PDF signature check.
pub const MOCK_PDF: &[u8] = b"%PDF-1.4\n% mock filing\n%%EOF";

/// Modern-era return text with revenue 1,000,000 and two officers
/// (145,000 + 120,000).
pub const SAMPLE_FILING_TEXT: &str = "\
Form 990 (2019) Return of Organization Exempt From Income Tax
For calendar year 2019
Name of organization RIVERBEND COMMUNITY FOUNDATION
Part I Summary
1h Total contributions and grants 700,000
2g Total program service revenue 250,000
12 Total revenue 1,000,000
25 Total functional expenses 900,000
Part VII Section A. Officers, Directors, Trustees, Key Employees, and Highest Compensated Employees
ANNA LEE Chief Executive Officer 145,000
BEN PARK President 120,000
Part VIII Statement of Revenue
";

/// Tracks how many callers are inside a section at once, and the peak.
#[derive(Debug, Default)]
pub struct InFlightGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlightGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark entry; the returned guard marks exit when dropped.
    pub fn enter(&self) -> InFlightGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        InFlightGuard(self)
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    /// Highest concurrent occupancy observed.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

pub struct InFlightGuard<'a>(&'a InFlightGauge);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Record of a call made to the mock registry.
#[derive(Debug, Clone, PartialEq)]
pub enum MockRegistryCall {
    Search { term: String, page: u32 },
    Organization { ein: Ein },
}

enum ScriptedPage {
    Organizations(Vec<OrganizationSummary>),
    Failure(RegistryError),
}

/// A mock registry.
///
/// Search responses are scripted per term and consumed in call order, so a
/// scripted failure followed by a page models a retried page. Once a term's
/// script is exhausted every further page is [`SearchPage::End`].
#[derive(Clone, Default)]
pub struct MockRegistry {
    pages: Arc<Mutex<HashMap<String, VecDeque<ScriptedPage>>>>,
    organizations: Arc<RwLock<HashMap<Ein, Organization>>>,
    organization_failures: Arc<RwLock<HashMap<Ein, RegistryError>>>,
    latency: Duration,
    gauge: Arc<InFlightGauge>,
    calls: Arc<RwLock<Vec<MockRegistryCall>>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a page of results for a term.
    pub fn with_page(self, term: impl Into<String>, organizations: Vec<OrganizationSummary>) -> Self {
        self.pages
            .lock()
            .unwrap()
            .entry(term.into())
            .or_default()
            .push_back(ScriptedPage::Organizations(organizations));
        self
    }

    /// Queue a failed page for a term.
    pub fn with_search_failure(self, term: impl Into<String>, error: RegistryError) -> Self {
        self.pages
            .lock()
            .unwrap()
            .entry(term.into())
            .or_default()
            .push_back(ScriptedPage::Failure(error));
        self
    }

    /// Register an organization's detail.
    pub fn with_organization(self, organization: Organization) -> Self {
        self.organizations
            .write()
            .unwrap()
            .insert(organization.ein, organization);
        self
    }

    /// Make detail lookups for an EIN fail.
    pub fn with_organization_failure(self, ein: Ein, error: RegistryError) -> Self {
        self.organization_failures
            .write()
            .unwrap()
            .insert(ein, error);
        self
    }

    /// Delay every call, to make overlapping calls observable.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn gauge(&self) -> &InFlightGauge {
        &self.gauge
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockRegistryCall> {
        self.calls.read().unwrap().clone()
    }

    /// Search calls made for one term, as page numbers.
    pub fn pages_requested(&self, term: &str) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockRegistryCall::Search { term: t, page } if t == term => Some(page),
                _ => None,
            })
            .collect()
    }

    pub fn organization_lookups(&self, ein: Ein) -> usize {
        self.calls()
            .iter()
            .filter(|call| **call == MockRegistryCall::Organization { ein })
            .count()
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl Registry for MockRegistry {
    async fn search(&self, term: &str, _jurisdiction: &str, page: u32) -> RegistryResult<SearchPage> {
        self.calls.write().unwrap().push(MockRegistryCall::Search {
            term: term.to_string(),
            page,
        });

        let _guard = self.gauge.enter();
        self.simulate_latency().await;

        let next = self
            .pages
            .lock()
            .unwrap()
            .get_mut(term)
            .and_then(|script| script.pop_front());

        match next {
            Some(ScriptedPage::Organizations(orgs)) => Ok(SearchPage::Organizations(orgs)),
            Some(ScriptedPage::Failure(error)) => Err(error),
            None => Ok(SearchPage::End),
        }
    }

    async fn organization(&self, ein: Ein) -> RegistryResult<Organization> {
        self.calls
            .write()
            .unwrap()
            .push(MockRegistryCall::Organization { ein });

        let _guard = self.gauge.enter();
        self.simulate_latency().await;

        if let Some(error) = self.organization_failures.read().unwrap().get(&ein) {
            return Err(error.clone());
        }
        self.organizations
            .read()
            .unwrap()
            .get(&ein)
            .cloned()
            .ok_or(RegistryError::NotFound)
    }
}

/// A mock document fetcher. Unknown URLs answer HTTP 404.
#[derive(Clone, Default)]
pub struct MockFetcher {
    documents: Arc<RwLock<HashMap<String, FetchResult<Vec<u8>>>>>,
    latency: Duration,
    gauge: Arc<InFlightGauge>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve [`MOCK_PDF`] at a URL.
    pub fn with_pdf(self, url: impl Into<String>) -> Self {
        self.with_document(url, MOCK_PDF.to_vec())
    }

    pub fn with_document(self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.documents.write().unwrap().insert(url.into(), Ok(bytes));
        self
    }

    pub fn with_failure(self, url: impl Into<String>, error: FetchError) -> Self {
        self.documents.write().unwrap().insert(url.into(), Err(error));
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn gauge(&self) -> &InFlightGauge {
        &self.gauge
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl DocumentFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<Vec<u8>> {
        self.calls.write().unwrap().push(url.to_string());

        let _guard = self.gauge.enter();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.documents
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| {
                Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
            })
    }
}

/// A mock AI extractor.
///
/// Scripted responses are returned in order; once they run out the default
/// response is used (a malformed-reply failure unless set).
#[derive(Clone, Default)]
pub struct MockAi {
    responses: Arc<Mutex<VecDeque<AiResult<AiFigures>>>>,
    default: Arc<RwLock<Option<AiResult<AiFigures>>>>,
    calls: Arc<AtomicUsize>,
}

impl MockAi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, response: AiResult<AiFigures>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn with_default(self, response: AiResult<AiFigures>) -> Self {
        *self.default.write().unwrap() = Some(response);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AiExtractor for MockAi {
    async fn extract(&self, _document: &[u8]) -> AiResult<AiFigures> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(response) = self.responses.lock().unwrap().pop_front() {
            return response;
        }
        self.default
            .read()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(AiError::Malformed("no scripted response".into())))
    }
}

/// A mock text extractor returning fixed text for every document.
#[derive(Clone)]
pub struct MockTextExtractor {
    response: TextResult<RecoveredText>,
    calls: Arc<AtomicUsize>,
}

impl MockTextExtractor {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            response: Ok(RecoveredText {
                text: text.into(),
                used_ocr: false,
            }),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(error: TextError) -> Self {
        Self {
            response: Err(error),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextExtractor for MockTextExtractor {
    async fn extract_text(&self, _document: &[u8]) -> TextResult<RecoveredText> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

/// Progress sink that keeps every snapshot.
#[derive(Clone, Default)]
pub struct RecordingProgress {
    snapshots: Arc<RwLock<Vec<ProgressSnapshot>>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshots(&self) -> Vec<ProgressSnapshot> {
        self.snapshots.read().unwrap().clone()
    }

    pub fn last(&self) -> Option<ProgressSnapshot> {
        self.snapshots.read().unwrap().last().cloned()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, snapshot: &ProgressSnapshot) {
        self.snapshots.write().unwrap().push(snapshot.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_registry_script_order() {
        let registry = MockRegistry::new()
            .with_search_failure("trust", RegistryError::Timeout)
            .with_page("trust", vec![OrganizationSummary::new(Ein(1), "A Trust")]);

        assert!(registry.search("trust", "CT", 0).await.is_err());
        assert!(matches!(
            registry.search("trust", "CT", 0).await,
            Ok(SearchPage::Organizations(orgs)) if orgs.len() == 1
        ));
        assert_eq!(registry.search("trust", "CT", 1).await.unwrap(), SearchPage::End);
        assert_eq!(registry.pages_requested("trust"), vec![0, 0, 1]);
    }

    #[tokio::test]
    async fn test_mock_registry_unknown_org() {
        let registry = MockRegistry::new();
        assert!(matches!(
            registry.organization(Ein(42)).await,
            Err(RegistryError::NotFound)
        ));
        assert_eq!(registry.organization_lookups(Ein(42)), 1);
    }

    #[test]
    fn test_gauge_tracks_peak() {
        let gauge = InFlightGauge::new();
        {
            let _a = gauge.enter();
            let _b = gauge.enter();
            assert_eq!(gauge.current(), 2);
        }
        let _c = gauge.enter();
        assert_eq!(gauge.current(), 1);
        assert_eq!(gauge.peak(), 2);
    }

    #[tokio::test]
    async fn test_mock_fetcher_unknown_url() {
        let fetcher = MockFetcher::new();
        assert!(matches!(
            fetcher.fetch("https://nowhere.test/x.pdf").await,
            Err(FetchError::Status { status: 404, .. })
        ));
    }
}
