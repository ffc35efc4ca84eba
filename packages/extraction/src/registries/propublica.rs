//! ProPublica Nonprofit Explorer implementation of the Registry trait.

use async_trait::async_trait;
use propublica_client::{OrganizationResponse, ProPublicaClient, ProPublicaError, SearchParams};

use crate::error::{RegistryError, RegistryResult};
use crate::traits::registry::{Registry, SearchPage};
use crate::types::organization::{Ein, Filing, Organization, OrganizationSummary};

/// Registry backed by the Nonprofit Explorer API.
///
/// # Example
///
/// ```rust,ignore
/// use filing_extraction::registries::{ProPublicaRegistry, RegistryExt};
///
/// let registry = ProPublicaRegistry::new(ProPublicaClient::new())
///     .rate_limited(NonZeroU32::new(5).unwrap());
/// ```
#[derive(Clone, Default)]
pub struct ProPublicaRegistry {
    client: ProPublicaClient,
}

impl ProPublicaRegistry {
    pub fn new(client: ProPublicaClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Registry for ProPublicaRegistry {
    async fn search(&self, term: &str, jurisdiction: &str, page: u32) -> RegistryResult<SearchPage> {
        match self
            .client
            .search(&SearchParams::new(term, jurisdiction, page))
            .await
        {
            Ok(response) => Ok(SearchPage::Organizations(
                response
                    .organizations
                    .into_iter()
                    .map(|org| OrganizationSummary::new(Ein(org.ein), org.name))
                    .collect(),
            )),
            // Past the last page
            Err(ProPublicaError::NotFound) => Ok(SearchPage::End),
            Err(e) => Err(map_error(e)),
        }
    }

    async fn organization(&self, ein: Ein) -> RegistryResult<Organization> {
        let response = self.client.organization(ein.0).await.map_err(map_error)?;
        Ok(organization_from_response(response))
    }
}

/// Structured filings first, then document-only filings.
fn organization_from_response(response: OrganizationResponse) -> Organization {
    let structured = response.filings_with_data.into_iter().map(|f| Filing {
        tax_year: f.tax_prd_yr,
        has_structured_data: true,
        total_revenue: f.totrevenue,
        total_expenses: f.totfuncexpns,
        compensation_pct: f.pct_compnsatncurrofcr,
        document_url: f.pdf_url,
    });
    let unstructured = response
        .filings_without_data
        .into_iter()
        .map(|f| Filing::unstructured(f.tax_prd_yr, f.pdf_url));

    Organization {
        ein: Ein(response.organization.ein),
        name: response.organization.name,
        filings: structured.chain(unstructured).collect(),
    }
}

fn map_error(error: ProPublicaError) -> RegistryError {
    if error.is_timeout() {
        return RegistryError::Timeout;
    }
    match error {
        ProPublicaError::RateLimited { retry_after_secs } => {
            RegistryError::RateLimited { retry_after_secs }
        }
        ProPublicaError::NotFound => RegistryError::NotFound,
        ProPublicaError::Api { status, message } => RegistryError::Api { status, message },
        ProPublicaError::Http(e) if e.is_decode() => RegistryError::Decode(e.to_string()),
        ProPublicaError::Http(e) => RegistryError::Transport(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::select::{select_filing, InlineDecision};

    #[test]
    fn test_filings_ordered_structured_first() {
        let raw = r#"{
            "organization": {"ein": 61234567, "name": "Hartford Youth Alliance"},
            "filings_with_data": [
                {"tax_prd_yr": 2019, "totrevenue": 500000, "totfuncexpns": 400000, "pct_compnsatncurrofcr": 0.1}
            ],
            "filings_without_data": [
                {"tax_prd_yr": 2021, "pdf_url": "null"}
            ]
        }"#;
        let response: OrganizationResponse = serde_json::from_str(raw).unwrap();
        let org = organization_from_response(response);

        assert_eq!(org.ein, Ein(61234567));
        assert_eq!(org.filings.len(), 2);
        assert!(org.filings[0].has_structured_data);
        assert_eq!(org.filings[0].compensation_pct, Some(0.1));
        assert!(!org.filings[1].has_structured_data);
        assert!(org.filings[1].document_url.is_none());

        // Newer document-only filing wins, and has nothing to download
        let selection = select_filing(&org);
        assert_eq!(selection.year, 2021);
        assert_eq!(selection.decision, InlineDecision::DocumentRequired);
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            map_error(ProPublicaError::RateLimited { retry_after_secs: 30 }),
            RegistryError::RateLimited { retry_after_secs: 30 }
        ));
        assert!(matches!(
            map_error(ProPublicaError::Api {
                status: 500,
                message: "boom".into()
            }),
            RegistryError::Api { status: 500, .. }
        ));
        assert!(matches!(
            map_error(ProPublicaError::NotFound),
            RegistryError::NotFound
        ));
    }
}
