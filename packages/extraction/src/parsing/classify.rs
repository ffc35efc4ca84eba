//! Form-era classification.
//!
//! The annual return was redesigned for tax year 2008. Older filings lay
//! out revenue and officer compensation differently, so the pattern set is
//! chosen by era.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Layout generation of a filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormEra {
    /// Tax years before 2008.
    Legacy,
    /// Tax year 2008 and later.
    Modern,
    /// Indicators inconclusive. Extraction treats this as [`FormEra::Modern`].
    Unknown,
}

impl FormEra {
    /// The era whose patterns should be applied.
    pub fn effective(self) -> Self {
        match self {
            Self::Legacy => Self::Legacy,
            Self::Modern | Self::Unknown => Self::Modern,
        }
    }
}

lazy_static! {
    static ref MODERN_INDICATORS: Vec<Regex> = compile(&[
        r"(?i)Part VIII.*Statement of Revenue",
        r"(?i)Part VII.*Officers.*Directors.*Trustees.*Key Employees",
        r"(?i)Schedule J.*Compensation Information",
        r"(?i)Part VI.*Governance.*Management.*Disclosure",
        r"(?i)990\s*\((?:2008|2009|201\d|202\d)\)",
    ]);
    static ref LEGACY_INDICATORS: Vec<Regex> = compile(&[
        r"(?i)990\s*\((?:2001|2002|2003|2004|2005|2006|2007)\)",
        r"(?i)Revenue.*Expenses.*and.*Changes.*in.*Net.*Assets",
        r"(?i)Part I.*Revenue.*Expenses.*and.*Changes",
    ]);
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!(pattern = p, error = %e, "invalid era indicator");
                None
            }
        })
        .collect()
}

/// Count indicator hits for each era.
///
/// Modern wins only with strictly more hits. Any legacy hit otherwise
/// yields [`FormEra::Legacy`]; no hits at all yields [`FormEra::Unknown`].
pub fn classify_era(text: &str) -> FormEra {
    let modern = MODERN_INDICATORS.iter().filter(|re| re.is_match(text)).count();
    let legacy = LEGACY_INDICATORS.iter().filter(|re| re.is_match(text)).count();

    tracing::trace!(modern, legacy, "form era indicators");

    if modern > legacy {
        FormEra::Modern
    } else if legacy > 0 {
        FormEra::Legacy
    } else {
        FormEra::Unknown
    }
}
