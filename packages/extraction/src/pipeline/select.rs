//! Filing selection: which return to report, and whether the registry's
//! structured figures are enough to skip the document.

use crate::types::organization::{Filing, Organization};

/// How the selected filing's figures will be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineDecision {
    /// Revenue and compensation both derivable from registry fields.
    InlineComplete,
    /// Only one of the two derivable.
    InlinePartial,
    /// The document must be read.
    DocumentRequired,
    /// The organization has no filings.
    None,
}

/// Outcome of [`select_filing`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilingSelection<'a> {
    pub filing: Option<&'a Filing>,
    /// Tax year of the selected filing, 0 when there is none.
    pub year: i32,
    pub decision: InlineDecision,
    pub revenue: Option<f64>,
    pub compensation: Option<f64>,
}

/// Select the most recent filing and decide how to read it.
///
/// Candidates are the structured filings followed by the unstructured
/// ones; the first filing with the highest tax year wins. A structured
/// filing is inline-complete when revenue is positive and both expenses
/// and a non-negative compensation share are present. Compensation is
/// `expenses * share` rounded to cents.
pub fn select_filing(org: &Organization) -> FilingSelection<'_> {
    let Some(filing) = latest_filing(&org.filings) else {
        return FilingSelection {
            filing: None,
            year: 0,
            decision: InlineDecision::None,
            revenue: None,
            compensation: None,
        };
    };

    let (decision, revenue, compensation) = if filing.has_structured_data {
        let revenue = filing.total_revenue.filter(|r| *r > 0.0);
        let compensation = match (filing.total_expenses, filing.compensation_pct) {
            (Some(expenses), Some(pct)) if pct >= 0.0 => Some(round_cents(expenses * pct)),
            _ => None,
        };

        match (revenue, compensation) {
            (Some(_), Some(_)) => (InlineDecision::InlineComplete, revenue, compensation),
            (Some(_), None) | (None, Some(_)) => {
                (InlineDecision::InlinePartial, revenue, compensation)
            }
            (None, None) => (InlineDecision::DocumentRequired, None, None),
        }
    } else {
        (InlineDecision::DocumentRequired, None, None)
    };

    tracing::debug!(
        ein = %org.ein,
        year = filing.tax_year,
        ?decision,
        "filing selected"
    );

    FilingSelection {
        filing: Some(filing),
        year: filing.tax_year,
        decision,
        revenue,
        compensation,
    }
}

/// First filing carrying the maximum tax year.
fn latest_filing(filings: &[Filing]) -> Option<&Filing> {
    let mut best: Option<&Filing> = None;
    for filing in filings {
        match best {
            Some(current) if filing.tax_year <= current.tax_year => {}
            _ => best = Some(filing),
        }
    }
    best
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::organization::Ein;

    fn org(filings: Vec<Filing>) -> Organization {
        Organization {
            ein: Ein(61234567),
            name: "Hartford Youth Alliance".into(),
            filings,
        }
    }

    #[test]
    fn test_inline_complete() {
        let org = org(vec![Filing::structured(2020)
            .with_revenue(500_000.0)
            .with_expenses(400_000.0)
            .with_compensation_pct(0.10)]);

        let selection = select_filing(&org);
        assert_eq!(selection.decision, InlineDecision::InlineComplete);
        assert_eq!(selection.year, 2020);
        assert_eq!(selection.revenue, Some(500_000.0));
        assert_eq!(selection.compensation, Some(40_000.00));
    }

    #[test]
    fn test_newer_unstructured_filing_wins() {
        let org = org(vec![
            Filing::structured(2019)
                .with_revenue(300_000.0)
                .with_expenses(250_000.0)
                .with_compensation_pct(0.2),
            Filing::unstructured(2021, Some("https://filings.test/2021.pdf".into())),
        ]);

        let selection = select_filing(&org);
        assert_eq!(selection.year, 2021);
        assert_eq!(selection.decision, InlineDecision::DocumentRequired);
        assert!(selection.revenue.is_none());
    }

    #[test]
    fn test_tie_goes_to_first_seen() {
        let org = org(vec![
            Filing::structured(2021).with_revenue(10.0),
            Filing::unstructured(2021, Some("https://filings.test/dup.pdf".into())),
        ]);

        let selection = select_filing(&org);
        assert!(selection.filing.is_some_and(|f| f.has_structured_data));
        assert_eq!(selection.decision, InlineDecision::InlinePartial);
    }

    #[test]
    fn test_partial_with_compensation_only() {
        let org = org(vec![Filing::structured(2018)
            .with_revenue(0.0)
            .with_expenses(1_000.0)
            .with_compensation_pct(0.333)]);

        let selection = select_filing(&org);
        assert_eq!(selection.decision, InlineDecision::InlinePartial);
        assert_eq!(selection.revenue, None);
        assert_eq!(selection.compensation, Some(333.0));
    }

    #[test]
    fn test_structured_without_figures_needs_document() {
        let org = org(vec![Filing::structured(2017).with_expenses(5_000.0)]);
        assert_eq!(
            select_filing(&org).decision,
            InlineDecision::DocumentRequired
        );
    }

    #[test]
    fn test_negative_share_is_not_compensation() {
        let org = org(vec![Filing::structured(2017)
            .with_revenue(1_000.0)
            .with_expenses(500.0)
            .with_compensation_pct(-0.1)]);

        let selection = select_filing(&org);
        assert_eq!(selection.decision, InlineDecision::InlinePartial);
        assert_eq!(selection.compensation, None);
    }

    #[test]
    fn test_no_filings() {
        let org = org(vec![]);
        let selection = select_filing(&org);
        assert_eq!(selection.decision, InlineDecision::None);
        assert_eq!(selection.year, 0);
        assert!(selection.filing.is_none());
    }
}
