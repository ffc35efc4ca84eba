//! Era-specific pattern extraction over recovered filing text.
//!
//! Every scalar field has an ordered list of patterns; the first capture
//! that survives [`normalize_amount`] wins. Patterns are never combined.
//!
//! Officer compensation is read from a bounded window after the era's
//! officer-table marker, one amount per title.

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::classify::{classify_era, FormEra};
use super::confidence::score_confidence;
use super::normalize::normalize_amount;

/// Captured amount: accounting-negative or plain, optional cents.
const AMOUNT: &str = r"(\(\d[\d,]*(?:\.\d+)?\)|\d[\d,]*(?:\.\d+)?)";

/// Officer tables rarely run longer than this after their marker.
const OFFICER_WINDOW: usize = 20_000;

/// Header region searched for the organization name.
const NAME_REGION: usize = 2_000;

/// Header region searched for the tax year.
const YEAR_REGION: usize = 1_000;

const MIN_TAX_YEAR: i32 = 1990;
const MAX_TAX_YEAR: i32 = 2030;

/// Figures recovered from one filing's text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedFinancials {
    pub era: FormEra,
    pub organization_name: Option<String>,
    pub tax_year: Option<i32>,
    pub total_revenue: Option<f64>,
    pub contributions: Option<f64>,
    pub program_service_revenue: Option<f64>,
    pub investment_income: Option<f64>,
    pub total_expenses: Option<f64>,

    /// Title to amount, in title-pattern order.
    pub officer_compensation: IndexMap<String, f64>,

    pub confidence: f64,
}

impl ParsedFinancials {
    pub fn empty(era: FormEra) -> Self {
        Self {
            era,
            organization_name: None,
            tax_year: None,
            total_revenue: None,
            contributions: None,
            program_service_revenue: None,
            investment_income: None,
            total_expenses: None,
            officer_compensation: IndexMap::new(),
            confidence: 0.0,
        }
    }

    /// Sum of all officer amounts, `None` when no officer was found.
    pub fn executive_compensation_total(&self) -> Option<f64> {
        if self.officer_compensation.is_empty() {
            None
        } else {
            Some(self.officer_compensation.values().sum())
        }
    }

    /// Whether either headline figure was recovered.
    pub fn has_headline_figures(&self) -> bool {
        self.total_revenue.is_some() || !self.officer_compensation.is_empty()
    }
}

struct FieldPatterns {
    total_revenue: Vec<Regex>,
    contributions: Vec<Regex>,
    program_service_revenue: Vec<Regex>,
    investment_income: Vec<Regex>,
    total_expenses: Vec<Regex>,
}

struct TitlePattern {
    title: &'static str,
    regex: Regex,
    /// Skip matches whose optional first group captured a qualifier,
    /// e.g. "Vice" in front of "President".
    reject_qualified: bool,
}

struct OfficerPatterns {
    marker: Regex,
    end: Regex,
    /// Search the whole text when the marker is missing.
    marker_optional: bool,
    titles: Vec<TitlePattern>,
}

fn compile(templates: &[&str]) -> Vec<Regex> {
    templates
        .iter()
        .filter_map(|t| {
            let pattern = t.replace("{amount}", AMOUNT);
            match Regex::new(&pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::error!(pattern = %pattern, error = %e, "invalid extraction pattern");
                    None
                }
            }
        })
        .collect()
}

fn compile_one(pattern: &str) -> Regex {
    compile(&[pattern])
        .pop()
        .unwrap_or_else(|| Regex::new("$^").expect("never-matching regex is valid"))
}

fn titles(specs: &[(&'static str, &str, bool)]) -> Vec<TitlePattern> {
    specs
        .iter()
        .map(|(title, template, reject_qualified)| TitlePattern {
            title: *title,
            regex: compile_one(template),
            reject_qualified: *reject_qualified,
        })
        .collect()
}

lazy_static! {
    static ref MODERN_FIELDS: FieldPatterns = FieldPatterns {
        total_revenue: compile(&[
            // Part I summary
            r"(?is)Total revenue.*?[\s\$]+{amount}",
            r"(?is)12\s+Total revenue.*?{amount}",
            r"(?is)Line 12.*?Total revenue.*?{amount}",
            // Part VIII statement
            r"(?is)Part VIII.*?Statement of Revenue.*?Total.*?{amount}",
            r"(?is)12\s+Total revenue \(must equal Part VIII.*?line 12\).*?{amount}",
            r"(?s)TOTAL REVENUE.*?{amount}",
        ]),
        contributions: compile(&[
            r"(?is)1h\s+Total.*?contributions.*?{amount}",
            r"(?is)Contributions.*?grants.*?line 1h.*?{amount}",
            r"(?is)Total contributions.*?{amount}",
        ]),
        program_service_revenue: compile(&[
            r"(?is)2g\s+Total.*?program service revenue.*?{amount}",
            r"(?is)Program service revenue.*?line 2g.*?{amount}",
            r"(?is)Total program service revenue.*?{amount}",
        ]),
        investment_income: compile(&[
            r"(?is)3\s+Investment income.*?{amount}",
            r"(?is)Line 3.*?Investment income.*?{amount}",
        ]),
        total_expenses: compile(&[
            r"(?is)25\s+Total functional expenses.*?{amount}",
            r"(?is)Total expenses.*?line 25.*?{amount}",
            r"(?s)TOTAL EXPENSES.*?{amount}",
        ]),
    };

    static ref LEGACY_FIELDS: FieldPatterns = FieldPatterns {
        total_revenue: compile(&[
            r"(?is)Total revenue.*?{amount}",
            r"(?is)REVENUE.*?TOTAL.*?{amount}",
            r"(?is)Total support and revenue.*?{amount}",
        ]),
        contributions: compile(&[
            r"(?is)Contributions.*?gifts.*?grants.*?{amount}",
            r"(?is)Direct public support.*?{amount}",
            r"(?is)Government grants.*?{amount}",
        ]),
        program_service_revenue: compile(&[
            r"(?is)Program service revenue.*?{amount}",
            r"(?is)Fees for services.*?{amount}",
        ]),
        investment_income: Vec::new(),
        total_expenses: compile(&[
            r"(?is)Total expenses.*?{amount}",
            r"(?is)EXPENSES.*?TOTAL.*?{amount}",
        ]),
    };

    // Title patterns are line-bounded: title and amount share a row.
    static ref MODERN_OFFICERS: OfficerPatterns = OfficerPatterns {
        marker: compile_one(
            r"(?is)Part VII.*?Section A.*?Officers.*?Directors.*?Trustees.*?Key Employees.*?Highest Compensated Employees",
        ),
        end: compile_one(r"(?i)Part VIII\b"),
        marker_optional: false,
        titles: titles(&[
            ("CEO", r"(?i)\b(?:Chief Executive Officer|CEO)\b.*?{amount}", false),
            ("President", r"(?i)(vice[\s-]*)?\bPresident\b.*?{amount}", true),
            ("Executive Director", r"(?i)\bExecutive Director\b.*?{amount}", false),
            ("CFO", r"(?i)\b(?:Chief Financial Officer|CFO)\b.*?{amount}", false),
            ("COO", r"(?i)\b(?:Chief Operating Officer|COO)\b.*?{amount}", false),
            ("Vice President", r"(?i)\bVice[\s-]*President\b.*?{amount}", false),
            ("Secretary", r"(?i)\bSecretary\b.*?{amount}", false),
            ("Treasurer", r"(?i)\bTreasurer\b.*?{amount}", false),
        ]),
    };

    // Older returns name the compensation column between title and amount.
    static ref LEGACY_OFFICERS: OfficerPatterns = OfficerPatterns {
        marker: compile_one(r"(?is)Part V.*?List of Officers.*?Directors.*?Trustees.*?Key Employees"),
        end: compile_one(r"(?i)Part VI\b"),
        marker_optional: true,
        titles: titles(&[
            ("CEO", r"(?is)\b(?:Chief Executive Officer|CEO)\b.*?compensation.*?{amount}", false),
            ("President", r"(?is)(vice[\s-]*)?\bPresident\b.*?compensation.*?{amount}", true),
            ("Executive Director", r"(?is)\bExecutive Director\b.*?compensation.*?{amount}", false),
        ]),
    };

    static ref NAME_PATTERNS: Vec<Regex> = compile(&[
        r"(?im)Name of organization[:\s]+(.*?)(?:\n|EIN)",
        r"(?im)Legal name of organization[:\s]+(.*?)(?:\n|$)",
        r"(?im)^([A-Z][A-Za-z\s,\.]+(?:INC|CORP|FOUNDATION|FUND|SOCIETY|ASSOCIATION|ORGANIZATION))",
    ]);

    static ref YEAR_PATTERNS: Vec<Regex> = compile(&[
        r"(?i)tax year (\d{4})",
        r"(?i)Tax year beginning.*?(\d{4})",
        r"(?i)Form 990.*?(\d{4})",
        r"(?i)calendar year (\d{4})",
    ]);
}

/// Applies the era's pattern sets to filing text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternExtractor;

impl PatternExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Classify the text, then extract with the matching era's patterns.
    pub fn extract(&self, text: &str) -> ParsedFinancials {
        self.extract_with_era(text, classify_era(text))
    }

    /// Extract assuming a known era. [`FormEra::Unknown`] uses modern
    /// patterns but is reported as unknown.
    pub fn extract_with_era(&self, text: &str, era: FormEra) -> ParsedFinancials {
        let (fields, officers) = match era.effective() {
            FormEra::Legacy => (&*LEGACY_FIELDS, &*LEGACY_OFFICERS),
            _ => (&*MODERN_FIELDS, &*MODERN_OFFICERS),
        };

        let mut data = ParsedFinancials {
            era,
            organization_name: extract_organization_name(text),
            tax_year: extract_tax_year(text),
            total_revenue: first_amount(&fields.total_revenue, text),
            contributions: first_amount(&fields.contributions, text),
            program_service_revenue: first_amount(&fields.program_service_revenue, text),
            investment_income: first_amount(&fields.investment_income, text),
            total_expenses: first_amount(&fields.total_expenses, text),
            officer_compensation: extract_officers(officers, text),
            confidence: 0.0,
        };
        data.confidence = score_confidence(&data);

        tracing::debug!(
            era = ?data.era,
            revenue = ?data.total_revenue,
            officers = data.officer_compensation.len(),
            confidence = data.confidence,
            "pattern extraction complete"
        );
        data
    }
}

/// First capture, across patterns in order, that normalizes to a value.
fn first_amount(patterns: &[Regex], text: &str) -> Option<f64> {
    patterns.iter().find_map(|re| {
        re.captures_iter(text).find_map(|caps| {
            caps.get(caps.len() - 1)
                .and_then(|m| normalize_amount(m.as_str()))
        })
    })
}

fn extract_officers(patterns: &OfficerPatterns, text: &str) -> IndexMap<String, f64> {
    let mut found = IndexMap::new();

    let window = match patterns.marker.find(text) {
        Some(m) => officer_window(&text[m.end()..], &patterns.end),
        None if patterns.marker_optional => text,
        None => return found,
    };

    for title in &patterns.titles {
        for caps in title.regex.captures_iter(window) {
            if title.reject_qualified && caps.get(1).is_some() {
                continue;
            }
            let amount = caps
                .get(caps.len() - 1)
                .and_then(|m| normalize_amount(m.as_str()));
            if let Some(amount) = amount.filter(|a| *a > 0.0) {
                // Later rows for the same title replace earlier ones
                found.insert(title.title.to_string(), amount);
            }
        }
    }
    found
}

/// Text after the marker up to the next section or the window limit.
fn officer_window<'a>(after_marker: &'a str, end: &Regex) -> &'a str {
    let bounded = char_prefix(after_marker, OFFICER_WINDOW);
    match end.find(bounded) {
        Some(m) => &bounded[..m.start()],
        None => bounded,
    }
}

fn extract_organization_name(text: &str) -> Option<String> {
    let header = char_prefix(text, NAME_REGION);
    NAME_PATTERNS.iter().find_map(|re| {
        let name = re.captures(header)?.get(1)?.as_str().trim();
        let len = name.chars().count();
        (len > 3 && len < 200).then(|| name.to_string())
    })
}

fn extract_tax_year(text: &str) -> Option<i32> {
    let header = char_prefix(text, YEAR_REGION);
    YEAR_PATTERNS.iter().find_map(|re| {
        let year: i32 = re.captures(header)?.get(1)?.as_str().parse().ok()?;
        (MIN_TAX_YEAR..=MAX_TAX_YEAR).contains(&year).then_some(year)
    })
}

/// Longest prefix of at most `max_chars` characters.
fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODERN_TEXT: &str = "\
Form 990 (2019) Return of Organization Exempt From Income Tax
For the 2019 calendar year, or tax year 2019
Name of organization HARBOR ARTS FOUNDATION INC
Part I Summary
1h Total contributions and grants 600,000
2g Total program service revenue 350,000
3 Investment income 12,500
12 Total revenue 1,000,000
25 Total functional expenses (950,000)
Part VII Section A. Officers, Directors, Trustees, Key Employees, and Highest Compensated Employees
JANE ROE Chief Executive Officer 145,000
JOHN DOE Vice President 90,000
MARY MAJOR President 120,000
ALEX ADAMS Treasurer 0
SAM SMITH Treasurer 15,000
Part VIII Statement of Revenue
CHRIS COE Secretary 99,999
";

    #[test]
    fn test_modern_fields() {
        let data = PatternExtractor::new().extract_with_era(MODERN_TEXT, FormEra::Modern);

        assert_eq!(data.total_revenue, Some(1_000_000.0));
        assert_eq!(data.contributions, Some(600_000.0));
        assert_eq!(data.program_service_revenue, Some(350_000.0));
        assert_eq!(data.investment_income, Some(12_500.0));
        assert_eq!(data.total_expenses, Some(-950_000.0));
        assert_eq!(data.tax_year, Some(2019));
        assert_eq!(
            data.organization_name.as_deref(),
            Some("HARBOR ARTS FOUNDATION INC")
        );
    }

    #[test]
    fn test_officer_titles_in_pattern_order() {
        let data = PatternExtractor::new().extract_with_era(MODERN_TEXT, FormEra::Modern);

        let titles: Vec<&str> = data.officer_compensation.keys().map(|k| k.as_str()).collect();
        assert_eq!(titles, vec!["CEO", "President", "Vice President", "Treasurer"]);
        assert_eq!(data.officer_compensation["President"], 120_000.0);
        assert_eq!(data.officer_compensation["Vice President"], 90_000.0);
        // Zero rows are ignored; the later non-zero row wins
        assert_eq!(data.officer_compensation["Treasurer"], 15_000.0);
        // Outside the officer window
        assert!(!data.officer_compensation.contains_key("Secretary"));

        assert_eq!(data.executive_compensation_total(), Some(370_000.0));
    }

    #[test]
    fn test_last_match_per_title_wins() {
        let text = "Part VII Section A Officers Directors Trustees Key Employees Highest Compensated Employees\n\
                    A SMITH CEO 100,000\n\
                    B JONES CEO 200,000\n";
        let data = PatternExtractor::new().extract_with_era(text, FormEra::Modern);
        assert_eq!(data.officer_compensation.len(), 1);
        assert_eq!(data.officer_compensation["CEO"], 200_000.0);
    }

    #[test]
    fn test_modern_officers_need_marker() {
        let text = "Total revenue 500,000\nJANE ROE CEO 100,000\n";
        let data = PatternExtractor::new().extract_with_era(text, FormEra::Modern);
        assert!(data.officer_compensation.is_empty());
        assert_eq!(data.total_revenue, Some(500_000.0));
    }

    #[test]
    fn test_legacy_fields() {
        let text = "\
Form 990 (2005)
Part I Revenue, Expenses, and Changes in Net Assets or Fund Balances
1a Direct public support 40,000
2 Program service revenue including government fees 25,000
12 Total revenue 70,000
17 Total expenses 65,000
Part V List of Officers, Directors, Trustees, and Key Employees
President, compensation 30,000
";
        let extractor = PatternExtractor::new();
        let data = extractor.extract(text);

        assert_eq!(data.era, FormEra::Legacy);
        assert_eq!(data.total_revenue, Some(70_000.0));
        assert_eq!(data.contributions, Some(40_000.0));
        assert_eq!(data.program_service_revenue, Some(25_000.0));
        assert_eq!(data.total_expenses, Some(65_000.0));
        assert_eq!(data.investment_income, None);
        assert_eq!(data.officer_compensation["President"], 30_000.0);
    }

    #[test]
    fn test_first_surviving_capture_wins() {
        // Implausible magnitude fails normalization; the next match is used
        let text = "Total revenue 99999999999999 then Total revenue 42,000";
        assert_eq!(first_amount(&LEGACY_FIELDS.total_revenue, text), Some(42_000.0));
    }

    #[test]
    fn test_tax_year_out_of_range_ignored() {
        assert_eq!(extract_tax_year("tax year 1850 and calendar year 2012"), Some(2012));
        assert_eq!(extract_tax_year("no year here"), None);
    }

    #[test]
    fn test_name_length_bounds() {
        assert_eq!(extract_organization_name("1 Name of organization ABC\n"), None);
        assert_eq!(
            extract_organization_name("Legal name of organization: Riverbend Food Pantry\n"),
            Some("Riverbend Food Pantry".to_string())
        );
    }

    #[test]
    fn test_char_prefix_respects_boundaries() {
        assert_eq!(char_prefix("héllo", 2), "hé");
        assert_eq!(char_prefix("hi", 10), "hi");
    }
}
