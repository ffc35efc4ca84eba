//! Nonprofit Filing Extraction Library
//!
//! Discovers the tax-exempt organizations registered in one jurisdiction and
//! recovers two headline figures for each: total revenue and executive
//! compensation, taken from the most recent filing.
//!
//! # Design Philosophy
//!
//! **"Cheapest reliable source first"**
//!
//! - Structured registry figures are used whenever the latest filing has them
//! - Documents are downloaded only when the registry can't answer
//! - AI reads the document; text recovery and patterns back it up
//! - Every organization yields exactly one record, failures included
//!
//! # Usage
//!
//! ```rust,ignore
//! use filing_extraction::{FallbackChain, Orchestrator, PipelineConfig};
//! use filing_extraction::ingestors::HttpDocumentFetcher;
//! use filing_extraction::registries::ProPublicaRegistry;
//! use filing_extraction::text::PdfTextExtractor;
//!
//! let config = PipelineConfig::new("CT")?;
//! let chain = FallbackChain::new(
//!     Arc::new(HttpDocumentFetcher::new()),
//!     Arc::new(PdfTextExtractor::new()),
//! );
//! let orchestrator = Orchestrator::new(Arc::new(ProPublicaRegistry::default()), chain, config)?;
//!
//! let terms = search_terms("CT", "Connecticut", false);
//! let report = orchestrator.run(&terms, &CancellationToken::new()).await;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator seams (Registry, DocumentFetcher, AiExtractor, TextExtractor)
//! - [`types`] - Organizations, filings, results and configuration
//! - [`parsing`] - Amount normalization, form classification and pattern extraction
//! - [`pipeline`] - Discovery, filing selection, fallback chain and orchestration
//! - [`registries`] - Registry implementations (ProPublica, rate limiting)
//! - [`ingestors`] - Document download
//! - [`text`] - PDF text layer and OCR fallback
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod ingestors;
pub mod parsing;
pub mod pipeline;
pub mod registries;
pub mod security;
pub mod testing;
pub mod text;
pub mod traits;
pub mod types;

#[cfg(feature = "gemini")]
pub mod ai;

// Re-export core types at crate root
pub use error::{AiError, ConfigError, FetchError, RegistryError, TextError};
pub use parsing::{classify_era, normalize_amount, FormEra, ParsedFinancials, PatternExtractor};
pub use pipeline::{
    search_terms, select_filing, FallbackChain, FilingSelection, InlineDecision, Orchestrator,
    RunReport,
};
pub use traits::{
    ai::{AiExtractor, AiFigures, ConfidenceLevel},
    document::DocumentFetcher,
    progress::{NoopProgress, ProgressSink},
    registry::{Registry, SearchPage},
    text::{OcrEngine, RecoveredText, TextExtractor},
};
pub use types::{
    config::{jurisdiction_name, DiscoveryConfig, ParsingMethod, PipelineConfig, RetryPolicy},
    organization::{Ein, Filing, Organization, OrganizationSummary},
    progress::ProgressSnapshot,
    result::{sort_by_revenue, DataSource, ErrorKind, ExtractionResult, OrganizationRecord},
};
