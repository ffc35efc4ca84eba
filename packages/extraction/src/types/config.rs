//! Configuration types for discovery and extraction runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// How documents without structured figures are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsingMethod {
    /// Model extraction first, pattern matching as fallback.
    #[default]
    Ai,
    /// Pattern matching only; the AI stage is never invoked.
    Ocr,
}

impl ParsingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Ocr => "ocr",
        }
    }
}

impl fmt::Display for ParsingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParsingMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ai" => Ok(Self::Ai),
            "ocr" => Ok(Self::Ocr),
            other => Err(ConfigError::Invalid {
                name: "parsing_method",
                reason: format!("expected 'ai' or 'ocr', got '{other}'"),
            }),
        }
    }
}

/// Retry schedule for transient AI failures.
///
/// Delay before retry `n` (zero-based) is `base_delay * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(retry))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(2),
        }
    }
}

/// Settings for paginated EIN discovery.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Consecutive page failures after which a term is abandoned.
    pub max_consecutive_failures: u32,

    /// Hard ceiling on pages fetched per term.
    pub max_pages_per_term: u32,

    /// Pause between successful pages.
    pub page_delay: Duration,

    /// Pause after a failed page before retrying it.
    pub failure_backoff: Duration,

    /// Upper bound on honouring a registry `Retry-After`.
    pub max_retry_after: Duration,

    /// Add single letters and common bigrams to the term catalogue.
    pub include_alphabet: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 3,
            max_pages_per_term: 500,
            page_delay: Duration::from_millis(100),
            failure_backoff: Duration::from_secs(1),
            max_retry_after: Duration::from_secs(60),
            include_alphabet: false,
        }
    }
}

/// Configuration for a whole run.
///
/// # Example
///
/// ```rust
/// use filing_extraction::types::config::{ParsingMethod, PipelineConfig};
///
/// let config = PipelineConfig::new("CT")
///     .unwrap()
///     .with_parsing_method(ParsingMethod::Ocr)
///     .with_batch_size(10);
/// assert_eq!(config.jurisdiction_name, "Connecticut");
/// ```
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Two-letter jurisdiction code, upper case.
    pub jurisdiction: String,

    /// Full jurisdiction name, used as a discovery term.
    pub jurisdiction_name: String,

    pub parsing_method: ParsingMethod,

    /// Concurrent registry detail lookups. Default: 10.
    pub registry_concurrency: usize,

    /// Concurrent document pipelines (download, AI, text). Default: 3.
    pub document_concurrency: usize,

    /// Organizations dispatched together. Default: 20.
    pub batch_size: usize,

    /// Pause between batches. Default: 500 ms.
    pub batch_pause: Duration,

    /// Ceiling for the inter-batch pause while batches keep hitting rate
    /// limits. Default: 30 s.
    pub max_batch_pause: Duration,

    /// Emit a progress snapshot every N completions. Default: 3.
    pub snapshot_every: usize,

    /// Log a progress line every N completions. Default: 5.
    pub log_every: usize,

    pub ai_retry: RetryPolicy,

    pub discovery: DiscoveryConfig,
}

impl PipelineConfig {
    /// Defaults for a jurisdiction code such as `"CT"`.
    pub fn new(jurisdiction: &str) -> Result<Self, ConfigError> {
        let code = jurisdiction.trim().to_ascii_uppercase();
        let name = jurisdiction_name(&code).ok_or_else(|| ConfigError::Invalid {
            name: "jurisdiction",
            reason: format!("unknown jurisdiction code '{jurisdiction}'"),
        })?;

        Ok(Self {
            jurisdiction: code,
            jurisdiction_name: name.to_string(),
            parsing_method: ParsingMethod::default(),
            registry_concurrency: 10,
            document_concurrency: 3,
            batch_size: 20,
            batch_pause: Duration::from_millis(500),
            max_batch_pause: Duration::from_secs(30),
            snapshot_every: 3,
            log_every: 5,
            ai_retry: RetryPolicy::default(),
            discovery: DiscoveryConfig::default(),
        })
    }

    pub fn with_parsing_method(mut self, method: ParsingMethod) -> Self {
        self.parsing_method = method;
        self
    }

    pub fn with_registry_concurrency(mut self, n: usize) -> Self {
        self.registry_concurrency = n;
        self
    }

    pub fn with_document_concurrency(mut self, n: usize) -> Self {
        self.document_concurrency = n;
        self
    }

    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    pub fn with_batch_pause(mut self, pause: Duration) -> Self {
        self.batch_pause = pause;
        self
    }

    pub fn with_ai_retry(mut self, policy: RetryPolicy) -> Self {
        self.ai_retry = policy;
        self
    }

    pub fn with_discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.discovery = discovery;
        self
    }

    /// Zero every pause and backoff. For tests and dry runs.
    pub fn without_delays(mut self) -> Self {
        self.batch_pause = Duration::ZERO;
        self.max_batch_pause = Duration::ZERO;
        self.ai_retry.base_delay = Duration::ZERO;
        self.discovery.page_delay = Duration::ZERO;
        self.discovery.failure_backoff = Duration::ZERO;
        self.discovery.max_retry_after = Duration::ZERO;
        self
    }

    /// Reject settings that would stall or never dispatch work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("registry_concurrency", self.registry_concurrency),
            ("document_concurrency", self.document_concurrency),
            ("batch_size", self.batch_size),
            ("snapshot_every", self.snapshot_every),
            ("log_every", self.log_every),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    name,
                    reason: "must be greater than zero".into(),
                });
            }
        }
        if self.discovery.max_consecutive_failures == 0 {
            return Err(ConfigError::Invalid {
                name: "max_consecutive_failures",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

/// Full name for a two-letter US jurisdiction code.
pub fn jurisdiction_name(code: &str) -> Option<&'static str> {
    let code = code.to_ascii_uppercase();
    JURISDICTIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

const JURISDICTIONS: &[(&str, &str)] = &[
    ("AL", "Alabama"),
    ("AK", "Alaska"),
    ("AZ", "Arizona"),
    ("AR", "Arkansas"),
    ("CA", "California"),
    ("CO", "Colorado"),
    ("CT", "Connecticut"),
    ("DE", "Delaware"),
    ("DC", "District of Columbia"),
    ("FL", "Florida"),
    ("GA", "Georgia"),
    ("HI", "Hawaii"),
    ("ID", "Idaho"),
    ("IL", "Illinois"),
    ("IN", "Indiana"),
    ("IA", "Iowa"),
    ("KS", "Kansas"),
    ("KY", "Kentucky"),
    ("LA", "Louisiana"),
    ("ME", "Maine"),
    ("MD", "Maryland"),
    ("MA", "Massachusetts"),
    ("MI", "Michigan"),
    ("MN", "Minnesota"),
    ("MS", "Mississippi"),
    ("MO", "Missouri"),
    ("MT", "Montana"),
    ("NE", "Nebraska"),
    ("NV", "Nevada"),
    ("NH", "New Hampshire"),
    ("NJ", "New Jersey"),
    ("NM", "New Mexico"),
    ("NY", "New York"),
    ("NC", "North Carolina"),
    ("ND", "North Dakota"),
    ("OH", "Ohio"),
    ("OK", "Oklahoma"),
    ("OR", "Oregon"),
    ("PA", "Pennsylvania"),
    ("PR", "Puerto Rico"),
    ("RI", "Rhode Island"),
    ("SC", "South Carolina"),
    ("SD", "South Dakota"),
    ("TN", "Tennessee"),
    ("TX", "Texas"),
    ("UT", "Utah"),
    ("VT", "Vermont"),
    ("VA", "Virginia"),
    ("WA", "Washington"),
    ("WV", "West Virginia"),
    ("WI", "Wisconsin"),
    ("WY", "Wyoming"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::new("ct").unwrap();
        assert_eq!(config.jurisdiction, "CT");
        assert_eq!(config.jurisdiction_name, "Connecticut");
        assert_eq!(config.registry_concurrency, 10);
        assert_eq!(config.document_concurrency, 3);
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.parsing_method, ParsingMethod::Ai);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_jurisdiction() {
        assert!(PipelineConfig::new("ZZ").is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = PipelineConfig::new("NY")
            .unwrap()
            .with_document_concurrency(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                name: "document_concurrency",
                ..
            })
        ));
    }

    #[test]
    fn test_parsing_method_from_str() {
        assert_eq!("OCR".parse::<ParsingMethod>().unwrap(), ParsingMethod::Ocr);
        assert_eq!(" ai ".parse::<ParsingMethod>().unwrap(), ParsingMethod::Ai);
        assert!("vision".parse::<ParsingMethod>().is_err());
    }

    #[test]
    fn test_retry_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(1), Duration::from_secs(4));
    }
}
