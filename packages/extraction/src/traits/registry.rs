//! Nonprofit registry trait.

use async_trait::async_trait;

use crate::error::RegistryResult;
use crate::types::organization::{Ein, Organization, OrganizationSummary};

/// One answer from the paginated search endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPage {
    /// Organizations on this page. An empty list also ends the term.
    Organizations(Vec<OrganizationSummary>),
    /// The registry has no page at this index.
    End,
}

/// Registry of tax-exempt organizations.
///
/// Implementations must be cheap to share across concurrent tasks; the
/// pipeline bounds how many calls are in flight.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Fetch one zero-based page of organizations matching `term` within
    /// the jurisdiction.
    async fn search(&self, term: &str, jurisdiction: &str, page: u32) -> RegistryResult<SearchPage>;

    /// Fetch an organization's detail and filing history.
    async fn organization(&self, ein: Ein) -> RegistryResult<Organization>;
}
