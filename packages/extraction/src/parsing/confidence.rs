//! Confidence scoring for pattern-extracted figures.

use super::patterns::ParsedFinancials;

const REVENUE: f64 = 0.30;
const EXPENSES: f64 = 0.20;
const CONTRIBUTIONS: f64 = 0.10;
const PROGRAM_SERVICE: f64 = 0.10;
const OFFICERS: f64 = 0.15;
const NAME: f64 = 0.10;
const TAX_YEAR: f64 = 0.05;
const CONSISTENCY: f64 = 0.10;

/// Components may differ from the stated total by less than this share.
const CONSISTENCY_TOLERANCE: f64 = 0.2;

/// Score how much of a filing the patterns recovered, in `[0, 1]`.
///
/// Each present field adds its weight to both the score and the maximum.
/// The consistency check always counts toward the maximum and only scores
/// when non-zero contributions plus non-zero program-service revenue land
/// within tolerance of total revenue.
pub fn score_confidence(data: &ParsedFinancials) -> f64 {
    let checks = [
        (data.total_revenue.is_some(), REVENUE),
        (data.total_expenses.is_some(), EXPENSES),
        (data.contributions.is_some(), CONTRIBUTIONS),
        (data.program_service_revenue.is_some(), PROGRAM_SERVICE),
        (!data.officer_compensation.is_empty(), OFFICERS),
        (data.organization_name.is_some(), NAME),
        (data.tax_year.is_some(), TAX_YEAR),
    ];

    let (mut score, mut max) = checks
        .iter()
        .filter(|(present, _)| *present)
        .fold((0.0, 0.0), |(s, m), (_, w)| (s + w, m + w));

    if let (Some(total), Some(contributions), Some(program)) = (
        data.total_revenue,
        data.contributions,
        data.program_service_revenue,
    ) {
        if total != 0.0
            && contributions != 0.0
            && program != 0.0
            && ((contributions + program) - total).abs() / total.abs() < CONSISTENCY_TOLERANCE
        {
            score += CONSISTENCY;
        }
    }
    max += CONSISTENCY;

    (score / max).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::classify::FormEra;

    fn empty() -> ParsedFinancials {
        ParsedFinancials::empty(FormEra::Modern)
    }

    #[test]
    fn test_revenue_and_name_only() {
        let data = ParsedFinancials {
            total_revenue: Some(250_000.0),
            organization_name: Some("Example Arts Foundation".into()),
            ..empty()
        };
        let score = score_confidence(&data);
        assert!((score - 0.40 / 0.50).abs() < 1e-9, "score was {score}");
    }

    #[test]
    fn test_everything_consistent_is_one() {
        let mut data = ParsedFinancials {
            total_revenue: Some(100_000.0),
            total_expenses: Some(90_000.0),
            contributions: Some(60_000.0),
            program_service_revenue: Some(35_000.0),
            organization_name: Some("Harbor Trust".into()),
            tax_year: Some(2019),
            ..empty()
        };
        data.officer_compensation.insert("CEO".into(), 80_000.0);

        assert!((score_confidence(&data) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_inconsistent_components_lose_bonus() {
        let data = ParsedFinancials {
            total_revenue: Some(100_000.0),
            contributions: Some(10_000.0),
            program_service_revenue: Some(5_000.0),
            ..empty()
        };
        // (0.3 + 0.1 + 0.1) / (0.5 + 0.1)
        assert!((score_confidence(&data) - 0.5 / 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_zero_component_loses_bonus() {
        // Program revenue alone is within 5% of the total
        let data = ParsedFinancials {
            total_revenue: Some(100_000.0),
            contributions: Some(0.0),
            program_service_revenue: Some(95_000.0),
            ..empty()
        };
        assert!((score_confidence(&data) - 0.5 / 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_nothing_found_is_zero() {
        assert_eq!(score_confidence(&empty()), 0.0);
    }
}
