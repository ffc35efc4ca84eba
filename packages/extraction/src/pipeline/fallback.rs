//! Extraction fallback chain for filings that need their document read.
//!
//! Order, short-circuiting on the first success:
//!
//! 1. No document URL: `none` / `no-document`
//! 2. Download (the fetcher handles the alternate-header retry)
//! 3. AI extraction, when configured. Rate-limit failures stop here;
//!    other failures are retried, then fall through
//! 4. Text recovery plus pattern extraction: `ocr-fallback`, or
//!    `parse-failed`

use std::sync::Arc;

use crate::error::{AiError, FetchError};
use crate::parsing::PatternExtractor;
use crate::traits::{
    ai::{AiExtractor, AiFigures},
    document::DocumentFetcher,
    text::TextExtractor,
};
use crate::types::{
    config::RetryPolicy,
    organization::Filing,
    result::{ErrorKind, ExtractionResult},
};

/// Recovered text shorter than this cannot hold a return.
pub const MIN_TEXT_CHARS: usize = 100;

enum AiOutcome {
    Extracted(AiFigures),
    RateLimited(AiError),
    Failed(AiError),
}

/// Ordered dispatch over the document strategies.
pub struct FallbackChain {
    fetcher: Arc<dyn DocumentFetcher>,
    ai: Option<Arc<dyn AiExtractor>>,
    text: Arc<dyn TextExtractor>,
    patterns: PatternExtractor,
    ai_retry: RetryPolicy,
}

impl FallbackChain {
    /// Chain without an AI stage (pattern extraction only).
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, text: Arc<dyn TextExtractor>) -> Self {
        Self {
            fetcher,
            ai: None,
            text,
            patterns: PatternExtractor::new(),
            ai_retry: RetryPolicy::default(),
        }
    }

    /// Try the AI extractor before pattern extraction.
    pub fn with_ai(mut self, ai: Arc<dyn AiExtractor>) -> Self {
        self.ai = Some(ai);
        self
    }

    /// Drop the AI stage, leaving text recovery and patterns.
    pub fn without_ai(mut self) -> Self {
        self.ai = None;
        self
    }

    pub fn with_ai_retry(mut self, policy: RetryPolicy) -> Self {
        self.ai_retry = policy;
        self
    }

    pub fn uses_ai(&self) -> bool {
        self.ai.is_some()
    }

    /// Run the chain for one filing. Never fails: every outcome is an
    /// [`ExtractionResult`].
    pub async fn extract(&self, filing: &Filing) -> ExtractionResult {
        let Some(url) = filing.document_url.as_deref() else {
            return ExtractionResult::none(Some(ErrorKind::NoDocument));
        };

        let document = match self.fetcher.fetch(url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let kind = fetch_error_kind(&e);
                if kind == ErrorKind::RateLimit {
                    tracing::warn!(url, "rate limited on document download");
                } else {
                    tracing::debug!(url, error = %e, "document download failed");
                }
                return ExtractionResult::failed(kind);
            }
        };

        if let Some(ai) = &self.ai {
            match self.extract_with_ai(ai.as_ref(), &document).await {
                AiOutcome::Extracted(figures) => {
                    return ExtractionResult::ai(
                        figures.total_revenue,
                        figures.total_executive_compensation,
                    );
                }
                AiOutcome::RateLimited(e) => {
                    tracing::warn!(url, error = %e, "AI extraction rate limited");
                    return ExtractionResult::failed(ErrorKind::RateLimit);
                }
                AiOutcome::Failed(e) => {
                    tracing::warn!(url, error = %e, "AI extraction failed, trying pattern extraction");
                }
            }
        }

        self.extract_with_patterns(url, &document).await
    }

    async fn extract_with_ai(&self, ai: &dyn AiExtractor, document: &[u8]) -> AiOutcome {
        let mut retry = 0;
        loop {
            match ai.extract(document).await {
                Ok(figures) => {
                    tracing::debug!(
                        confidence = ?figures.confidence,
                        notes = figures.notes.as_deref().unwrap_or(""),
                        "AI extraction succeeded"
                    );
                    return AiOutcome::Extracted(figures);
                }
                Err(e) if e.is_rate_limit() => return AiOutcome::RateLimited(e),
                Err(e) if retry < self.ai_retry.max_retries => {
                    let delay = self.ai_retry.delay_for(retry);
                    tracing::debug!(retry = retry + 1, ?delay, error = %e, "retrying AI extraction");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    retry += 1;
                }
                Err(e) => return AiOutcome::Failed(e),
            }
        }
    }

    async fn extract_with_patterns(&self, url: &str, document: &[u8]) -> ExtractionResult {
        let recovered = match self.text.extract_text(document).await {
            Ok(recovered) => recovered,
            Err(e) => {
                tracing::debug!(url, error = %e, "text recovery failed");
                return ExtractionResult::failed(ErrorKind::ParseFailed);
            }
        };

        let length = recovered.text.trim().chars().count();
        if length < MIN_TEXT_CHARS {
            tracing::debug!(url, length, used_ocr = recovered.used_ocr, "insufficient text");
            return ExtractionResult::failed(ErrorKind::ParseFailed);
        }

        let parsed = self.patterns.extract(&recovered.text);
        if !parsed.has_headline_figures() {
            tracing::debug!(url, era = ?parsed.era, "no revenue or officer amounts matched");
            return ExtractionResult::failed(ErrorKind::ParseFailed);
        }

        ExtractionResult::ocr(
            parsed.total_revenue,
            parsed.executive_compensation_total(),
            parsed.confidence,
        )
    }
}

fn fetch_error_kind(error: &FetchError) -> ErrorKind {
    match error {
        FetchError::Forbidden { .. } => ErrorKind::DownloadForbidden,
        FetchError::RateLimited { .. } => ErrorKind::RateLimit,
        FetchError::Status { .. }
        | FetchError::NotPdf { .. }
        | FetchError::Timeout { .. }
        | FetchError::Http(_) => ErrorKind::DownloadFailed,
    }
}
