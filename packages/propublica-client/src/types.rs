use serde::{Deserialize, Deserializer, Serialize};

/// Query parameters for the organization search endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SearchParams {
    /// Free-text query term.
    pub query: String,
    /// Two-letter jurisdiction code (e.g. "CT").
    pub state: String,
    /// Subsection category filter; 3 selects 501(c)(3) organizations.
    pub category: u32,
    /// Zero-based page number.
    pub page: u32,
}

impl SearchParams {
    pub fn new(query: impl Into<String>, state: impl Into<String>, page: u32) -> Self {
        Self {
            query: query.into(),
            state: state.into(),
            category: 3,
            page,
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub organizations: Vec<OrganizationSummary>,
    #[serde(default)]
    pub total_results: Option<u64>,
    #[serde(default)]
    pub num_pages: Option<u32>,
    #[serde(default)]
    pub cur_page: Option<u32>,
}

/// Organization as listed in search results.
#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationSummary {
    pub ein: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

/// Response of the organization detail endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationResponse {
    pub organization: OrganizationInfo,
    #[serde(default)]
    pub filings_with_data: Vec<FilingWithData>,
    #[serde(default)]
    pub filings_without_data: Vec<FilingWithoutData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationInfo {
    pub ein: u64,
    #[serde(default)]
    pub name: String,
}

/// A filing for which the registry carries structured figures.
#[derive(Debug, Clone, Deserialize)]
pub struct FilingWithData {
    #[serde(default)]
    pub tax_prd_yr: i32,
    #[serde(default)]
    pub totrevenue: Option<f64>,
    #[serde(default)]
    pub totfuncexpns: Option<f64>,
    #[serde(default)]
    pub pct_compnsatncurrofcr: Option<f64>,
    #[serde(default, deserialize_with = "nullable_url")]
    pub pdf_url: Option<String>,
}

/// A filing known only by its period and scanned document.
#[derive(Debug, Clone, Deserialize)]
pub struct FilingWithoutData {
    #[serde(default)]
    pub tax_prd_yr: i32,
    #[serde(default)]
    pub formtype_str: Option<String>,
    #[serde(default, deserialize_with = "nullable_url")]
    pub pdf_url: Option<String>,
}

/// The registry sometimes serializes a missing URL as the string "null".
fn nullable_url<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|url| {
        let url = url.trim();
        !url.is_empty() && !url.eq_ignore_ascii_case("null")
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL_FIXTURE: &str = r#"{
        "organization": {"ein": 142007220, "name": "Example Arts Foundation", "state": "CT"},
        "filings_with_data": [
            {
                "tax_prd": 201912,
                "tax_prd_yr": 2019,
                "formtype": 0,
                "totrevenue": 500000,
                "totfuncexpns": 400000,
                "pct_compnsatncurrofcr": 0.1,
                "pdf_url": null
            }
        ],
        "filings_without_data": [
            {
                "tax_prd": 202112,
                "tax_prd_yr": 2021,
                "formtype_str": "990",
                "pdf_url": "null"
            },
            {
                "tax_prd_yr": 2020,
                "pdf_url": "https://projects.propublica.org/nonprofits/download-filing?path=x.pdf"
            }
        ]
    }"#;

    #[test]
    fn parse_organization_detail() {
        let data: OrganizationResponse = serde_json::from_str(DETAIL_FIXTURE).unwrap();
        assert_eq!(data.organization.ein, 142007220);
        assert_eq!(data.filings_with_data.len(), 1);

        let structured = &data.filings_with_data[0];
        assert_eq!(structured.tax_prd_yr, 2019);
        assert_eq!(structured.totrevenue, Some(500000.0));
        assert_eq!(structured.pct_compnsatncurrofcr, Some(0.1));
        assert!(structured.pdf_url.is_none());
    }

    #[test]
    fn literal_null_url_is_absent() {
        let data: OrganizationResponse = serde_json::from_str(DETAIL_FIXTURE).unwrap();
        assert!(data.filings_without_data[0].pdf_url.is_none());
        assert!(data.filings_without_data[1].pdf_url.is_some());
    }

    #[test]
    fn parse_search_page() {
        let raw = r#"{
            "total_results": 2,
            "num_pages": 1,
            "cur_page": 0,
            "organizations": [
                {"ein": 61234567, "name": "Hartford Youth Alliance", "city": "Hartford", "state": "CT"},
                {"ein": 69876543, "name": "New Haven Library Trust"}
            ]
        }"#;
        let page: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(page.organizations.len(), 2);
        assert_eq!(page.organizations[1].ein, 69876543);
        assert_eq!(page.num_pages, Some(1));
    }

    #[test]
    fn search_page_without_organizations_is_empty() {
        let page: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(page.organizations.is_empty());
    }
}
