use anyhow::{Context, Result};
use clap::Parser;
use filing_extraction::security::SecretString;
use filing_extraction::{
    search_terms, DiscoveryConfig, Ein, OrganizationSummary, ParsingMethod, PipelineConfig,
};
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line configuration. Every flag falls back to an environment
/// variable, and `.env` is loaded before parsing.
#[derive(Debug, Parser)]
#[command(
    name = "nonprofit-scraper",
    version,
    about = "Discover a jurisdiction's nonprofits and export revenue and executive compensation"
)]
pub struct Args {
    /// Two-letter jurisdiction code
    #[arg(long, env = "SCRAPER_JURISDICTION", default_value = "CT")]
    pub jurisdiction: String,

    /// How filing documents are read: `ai` or `ocr`
    #[arg(long, env = "SCRAPER_PARSING_METHOD", default_value = "ai")]
    pub parsing_method: ParsingMethod,

    /// Search terms to use instead of the built-in catalogue
    #[arg(long = "term", env = "SCRAPER_TERMS", value_delimiter = ',')]
    pub terms: Vec<String>,

    /// Add single- and two-letter terms to the built-in catalogue
    #[arg(long, env = "SCRAPER_ALPHABET")]
    pub alphabet: bool,

    /// Process these EINs directly, skipping discovery
    #[arg(long = "ein", value_delimiter = ',')]
    pub eins: Vec<u64>,

    /// Concurrent registry calls
    #[arg(long, env = "SCRAPER_REGISTRY_CONCURRENCY", default_value_t = 10)]
    pub registry_concurrency: usize,

    /// Concurrent document pipelines
    #[arg(long, env = "SCRAPER_DOCUMENT_CONCURRENCY", default_value_t = 3)]
    pub document_concurrency: usize,

    /// Organizations per batch
    #[arg(long, env = "SCRAPER_BATCH_SIZE", default_value_t = 20)]
    pub batch_size: usize,

    /// Pause between batches, in milliseconds
    #[arg(long, env = "SCRAPER_BATCH_PAUSE_MS", default_value_t = 500)]
    pub batch_pause_ms: u64,

    /// Pause between search pages, in milliseconds
    #[arg(long, env = "SCRAPER_PAGE_DELAY_MS", default_value_t = 100)]
    pub page_delay_ms: u64,

    /// Registry request quota per second (unlimited when unset)
    #[arg(long, env = "SCRAPER_REGISTRY_RPS")]
    pub registry_rps: Option<NonZeroU32>,

    /// Registry request timeout, in seconds
    #[arg(long, env = "SCRAPER_REGISTRY_TIMEOUT_SECS", default_value_t = 10)]
    pub registry_timeout_secs: u64,

    /// Document download timeout, in seconds
    #[arg(long, env = "SCRAPER_DOCUMENT_TIMEOUT_SECS", default_value_t = 30)]
    pub document_timeout_secs: u64,

    /// Gemini API key (required for `ai` parsing)
    #[arg(long, env = "GOOGLE_AI_API_KEY", hide_env_values = true)]
    pub api_key: Option<SecretString>,

    /// Gemini model
    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-2.5-flash")]
    pub model: String,

    /// Directory the CSV export is written to
    #[arg(long, env = "SCRAPER_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Stats file rewritten on every progress snapshot
    #[arg(long, env = "SCRAPER_STATS_FILE", default_value = "scraper_stats.json")]
    pub stats_file: PathBuf,
}

impl Args {
    /// Build and validate the pipeline configuration.
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let discovery = DiscoveryConfig {
            page_delay: Duration::from_millis(self.page_delay_ms),
            include_alphabet: self.alphabet,
            ..DiscoveryConfig::default()
        };

        let config = PipelineConfig::new(&self.jurisdiction)
            .context("Unsupported jurisdiction")?
            .with_parsing_method(self.parsing_method)
            .with_registry_concurrency(self.registry_concurrency)
            .with_document_concurrency(self.document_concurrency)
            .with_batch_size(self.batch_size)
            .with_batch_pause(Duration::from_millis(self.batch_pause_ms))
            .with_discovery(discovery);

        config.validate().context("Invalid pipeline settings")?;
        Ok(config)
    }

    /// Explicit terms when given, otherwise the catalogue for the
    /// jurisdiction.
    pub fn search_terms(&self, config: &PipelineConfig) -> Vec<String> {
        let explicit: Vec<String> = self
            .terms
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if !explicit.is_empty() {
            return explicit;
        }
        search_terms(
            &config.jurisdiction,
            &config.jurisdiction_name,
            config.discovery.include_alphabet,
        )
    }

    pub fn explicit_organizations(&self) -> Vec<OrganizationSummary> {
        self.eins
            .iter()
            .map(|ein| OrganizationSummary::new(Ein(*ein), ""))
            .collect()
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_timeout_secs)
    }

    pub fn document_timeout(&self) -> Duration {
        Duration::from_secs(self.document_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("nonprofit-scraper").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_flags_build_pipeline_config() {
        let args = parse(&[
            "--jurisdiction",
            "ri",
            "--parsing-method",
            "ocr",
            "--batch-size",
            "5",
            "--alphabet",
        ]);
        let config = args.pipeline_config().unwrap();

        assert_eq!(config.jurisdiction, "RI");
        assert_eq!(config.jurisdiction_name, "Rhode Island");
        assert_eq!(config.parsing_method, ParsingMethod::Ocr);
        assert_eq!(config.batch_size, 5);
        assert!(config.discovery.include_alphabet);
    }

    #[test]
    fn test_rejects_bad_settings() {
        assert!(parse(&["--jurisdiction", "ZZ"]).pipeline_config().is_err());
        assert!(parse(&["--batch-size", "0"]).pipeline_config().is_err());
        assert!(Args::try_parse_from(["nonprofit-scraper", "--parsing-method", "vision"]).is_err());
    }

    #[test]
    fn test_explicit_terms_replace_catalogue() {
        let args = parse(&["--term", "arts, ,museum"]);
        let config = args.pipeline_config().unwrap();
        assert_eq!(args.search_terms(&config), vec!["arts", "museum"]);

        let args = parse(&[]);
        let config = args.pipeline_config().unwrap();
        let terms = args.search_terms(&config);
        assert!(terms.len() > 2);
    }

    #[test]
    fn test_ein_list() {
        let args = parse(&["--ein", "61234567,142007220"]);
        let orgs = args.explicit_organizations();
        assert_eq!(orgs.len(), 2);
        assert_eq!(orgs[1].ein, Ein(142007220));
    }
}
