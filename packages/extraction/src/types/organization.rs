//! Organizations and their filings as reported by the registry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Employer identification number of a nonprofit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ein(pub u64);

impl fmt::Display for Ein {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Ein {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// An organization as it appears in search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationSummary {
    pub ein: Ein,
    pub name: String,
}

impl OrganizationSummary {
    pub fn new(ein: impl Into<Ein>, name: impl Into<String>) -> Self {
        Self {
            ein: ein.into(),
            name: name.into(),
        }
    }
}

/// Organization detail with its filing history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub ein: Ein,
    pub name: String,

    /// Filings with structured figures first, then document-only filings,
    /// each group in registry order.
    pub filings: Vec<Filing>,
}

impl Organization {
    pub fn new(ein: impl Into<Ein>, name: impl Into<String>) -> Self {
        Self {
            ein: ein.into(),
            name: name.into(),
            filings: Vec::new(),
        }
    }

    pub fn with_filing(mut self, filing: Filing) -> Self {
        self.filings.push(filing);
        self
    }
}

/// One annual return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filing {
    pub tax_year: i32,

    /// Whether the registry carries structured figures for this filing.
    pub has_structured_data: bool,

    pub total_revenue: Option<f64>,
    pub total_expenses: Option<f64>,

    /// Share of expenses paid as current officer compensation.
    pub compensation_pct: Option<f64>,

    /// Link to the scanned return, when one exists.
    pub document_url: Option<String>,
}

impl Filing {
    /// A filing the registry has digitized.
    pub fn structured(tax_year: i32) -> Self {
        Self {
            tax_year,
            has_structured_data: true,
            total_revenue: None,
            total_expenses: None,
            compensation_pct: None,
            document_url: None,
        }
    }

    /// A filing known only by its scanned document.
    pub fn unstructured(tax_year: i32, document_url: Option<String>) -> Self {
        Self {
            tax_year,
            has_structured_data: false,
            total_revenue: None,
            total_expenses: None,
            compensation_pct: None,
            document_url,
        }
    }

    pub fn with_revenue(mut self, revenue: f64) -> Self {
        self.total_revenue = Some(revenue);
        self
    }

    pub fn with_expenses(mut self, expenses: f64) -> Self {
        self.total_expenses = Some(expenses);
        self
    }

    pub fn with_compensation_pct(mut self, pct: f64) -> Self {
        self.compensation_pct = Some(pct);
        self
    }

    pub fn with_document(mut self, url: impl Into<String>) -> Self {
        self.document_url = Some(url.into());
        self
    }
}
