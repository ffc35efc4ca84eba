//! Per-organization outcome records.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::organization::Ein;

/// Which stage produced the figures on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    /// Structured registry figures
    Registry,
    /// Model-based document extraction
    Ai,
    /// Text recovery plus pattern matching
    OcrFallback,
    /// Nothing to extract from
    None,
    /// A stage failed
    Error,
}

impl DataSource {
    pub const ALL: [DataSource; 5] = [
        DataSource::Registry,
        DataSource::Ai,
        DataSource::OcrFallback,
        DataSource::None,
        DataSource::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registry => "registry",
            Self::Ai => "ai",
            Self::OcrFallback => "ocr-fallback",
            Self::None => "none",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a record carries no (or partial) figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    NoDocument,
    DownloadForbidden,
    DownloadFailed,
    RateLimit,
    ParseFailed,
    RegistryFailed,
    Unexpected,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 7] = [
        ErrorKind::NoDocument,
        ErrorKind::DownloadForbidden,
        ErrorKind::DownloadFailed,
        ErrorKind::RateLimit,
        ErrorKind::ParseFailed,
        ErrorKind::RegistryFailed,
        ErrorKind::Unexpected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoDocument => "no-document",
            Self::DownloadForbidden => "download-forbidden",
            Self::DownloadFailed => "download-failed",
            Self::RateLimit => "rate-limit",
            Self::ParseFailed => "parse-failed",
            Self::RegistryFailed => "registry-failed",
            Self::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Figures recovered for one filing, tagged with where they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub revenue: Option<f64>,
    pub executive_compensation: Option<f64>,
    pub source: DataSource,
    pub error: Option<ErrorKind>,

    /// Pattern-extraction confidence in [0, 1]; only set for
    /// [`DataSource::OcrFallback`].
    pub confidence: Option<f64>,
}

impl ExtractionResult {
    pub fn registry(revenue: Option<f64>, executive_compensation: Option<f64>) -> Self {
        Self {
            revenue,
            executive_compensation,
            source: DataSource::Registry,
            error: None,
            confidence: None,
        }
    }

    pub fn ai(revenue: Option<f64>, executive_compensation: Option<f64>) -> Self {
        Self {
            revenue,
            executive_compensation,
            source: DataSource::Ai,
            error: None,
            confidence: None,
        }
    }

    pub fn ocr(
        revenue: Option<f64>,
        executive_compensation: Option<f64>,
        confidence: f64,
    ) -> Self {
        Self {
            revenue,
            executive_compensation,
            source: DataSource::OcrFallback,
            error: None,
            confidence: Some(confidence),
        }
    }

    /// Nothing to extract. `reason` is `None` when the organization has no
    /// filings at all.
    pub fn none(reason: Option<ErrorKind>) -> Self {
        Self {
            revenue: None,
            executive_compensation: None,
            source: DataSource::None,
            error: reason,
            confidence: None,
        }
    }

    pub fn failed(kind: ErrorKind) -> Self {
        Self {
            revenue: None,
            executive_compensation: None,
            source: DataSource::Error,
            error: Some(kind),
            confidence: None,
        }
    }
}

/// One output row: an organization and the outcome for its latest filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub ein: Ein,
    pub name: String,
    pub filing_year: Option<i32>,
    #[serde(flatten)]
    pub result: ExtractionResult,
}

impl OrganizationRecord {
    pub fn new(
        ein: Ein,
        name: impl Into<String>,
        filing_year: Option<i32>,
        result: ExtractionResult,
    ) -> Self {
        Self {
            ein,
            name: name.into(),
            filing_year,
            result,
        }
    }
}

/// Sort records by revenue, largest first; records without revenue go last
/// in their original order.
pub fn sort_by_revenue(records: &mut [OrganizationRecord]) {
    records.sort_by(|a, b| match (a.result.revenue, b.result.revenue) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ein: u64, revenue: Option<f64>) -> OrganizationRecord {
        OrganizationRecord::new(
            Ein(ein),
            format!("Org {ein}"),
            Some(2021),
            ExtractionResult::registry(revenue, None),
        )
    }

    #[test]
    fn sort_puts_missing_revenue_last() {
        let mut records = vec![
            record(1, None),
            record(2, Some(10.0)),
            record(3, Some(500.0)),
            record(4, None),
            record(5, Some(75.5)),
        ];
        sort_by_revenue(&mut records);

        let order: Vec<u64> = records.iter().map(|r| r.ein.0).collect();
        assert_eq!(order, vec![3, 5, 2, 1, 4]);
    }

    #[test]
    fn labels_are_kebab_case() {
        assert_eq!(DataSource::OcrFallback.to_string(), "ocr-fallback");
        assert_eq!(ErrorKind::DownloadForbidden.to_string(), "download-forbidden");
        assert_eq!(
            serde_json::to_string(&ErrorKind::RateLimit).unwrap(),
            "\"rate-limit\""
        );
    }

    #[test]
    fn failed_result_has_no_figures() {
        let result = ExtractionResult::failed(ErrorKind::ParseFailed);
        assert_eq!(result.source, DataSource::Error);
        assert!(result.revenue.is_none());
        assert!(result.executive_compensation.is_none());
    }
}
