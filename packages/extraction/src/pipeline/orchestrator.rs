//! Concurrency orchestrator.
//!
//! Drives discovery and per-organization extraction. Organizations are
//! dispatched in fixed-size batches; every member of a batch runs
//! concurrently on the orchestrator's task and results are aggregated in
//! completion order. Two semaphores bound outstanding work: one for
//! registry calls and one for document pipelines.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::discovery::{Discovery, TermEnd};
use super::fallback::FallbackChain;
use super::pause;
use super::select::{select_filing, InlineDecision};
use super::state::RunState;
use crate::error::{ConfigError, RegistryError};
use crate::traits::{
    progress::{NoopProgress, ProgressSink},
    registry::Registry,
};
use crate::types::{
    config::{ParsingMethod, PipelineConfig},
    organization::OrganizationSummary,
    progress::ProgressSnapshot,
    result::{DataSource, ErrorKind, ExtractionResult, OrganizationRecord},
};

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One record per organization, in completion order.
    pub records: Vec<OrganizationRecord>,
    /// Final counters.
    pub snapshot: ProgressSnapshot,
    /// Cancellation stopped the run before all work was dispatched.
    pub interrupted: bool,
}

/// Runs the pipeline for one jurisdiction.
///
/// # Example
///
/// ```rust,ignore
/// let orchestrator = Orchestrator::new(registry, chain, config)?
///     .with_progress(Arc::new(monitor));
///
/// let terms = search_terms("CT", "Connecticut", false);
/// let report = orchestrator.run(&terms, &cancel).await;
/// ```
pub struct Orchestrator {
    registry: Arc<dyn Registry>,
    chain: FallbackChain,
    progress: Arc<dyn ProgressSink>,
    config: PipelineConfig,
    registry_permits: Semaphore,
    document_permits: Semaphore,
}

impl Orchestrator {
    /// Validates the configuration before anything is dispatched. In OCR
    /// mode the chain's AI stage is removed.
    pub fn new(
        registry: Arc<dyn Registry>,
        chain: FallbackChain,
        config: PipelineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let chain = match config.parsing_method {
            ParsingMethod::Ocr => chain.without_ai(),
            ParsingMethod::Ai => {
                if !chain.uses_ai() {
                    tracing::warn!("AI parsing selected but no AI extractor configured, using patterns only");
                }
                chain
            }
        }
        .with_ai_retry(config.ai_retry);

        Ok(Self {
            registry,
            chain,
            progress: Arc::new(NoopProgress),
            registry_permits: Semaphore::new(config.registry_concurrency),
            document_permits: Semaphore::new(config.document_concurrency),
            config,
        })
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Discover organizations across every term, then process the combined
    /// list in fixed-size batches.
    ///
    /// Cancellation during discovery skips processing entirely.
    pub async fn run(&self, terms: &[String], cancel: &CancellationToken) -> RunReport {
        let mut state = RunState::new();
        let discovery = Discovery::new(
            self.registry.as_ref(),
            &self.registry_permits,
            &self.config.jurisdiction,
            &self.config.discovery,
        );

        tracing::info!(
            jurisdiction = %self.config.jurisdiction,
            method = %self.config.parsing_method,
            terms = terms.len(),
            "starting run"
        );

        let mut discovered = Vec::new();
        for (index, term) in terms.iter().enumerate() {
            if cancel.is_cancelled() {
                return self.finish(state, true);
            }

            state.set_query(term.as_str());
            tracing::info!(term = %term, position = index + 1, of = terms.len(), "searching");

            let outcome = discovery.discover_term(term, state.seen_mut(), cancel).await;
            tracing::info!(
                term = %term,
                new = outcome.organizations.len(),
                pages = outcome.pages,
                end = ?outcome.end,
                total = state.total(),
                "term complete"
            );
            self.report(&state);

            if outcome.end == TermEnd::Cancelled {
                return self.finish(state, true);
            }
            discovered.extend(outcome.organizations);
        }

        tracing::info!(organizations = discovered.len(), "discovery complete");

        let finished = self.process_batches(discovered, &mut state, cancel).await;
        self.finish(state, !finished)
    }

    /// Process a known list of organizations, skipping duplicate EINs.
    pub async fn process_organizations(
        &self,
        organizations: Vec<OrganizationSummary>,
        cancel: &CancellationToken,
    ) -> RunReport {
        let mut state = RunState::new();
        state.set_query("explicit organizations");

        let unique: Vec<OrganizationSummary> = organizations
            .into_iter()
            .filter(|org| state.seen_mut().insert(org.ein))
            .collect();

        let finished = self.process_batches(unique, &mut state, cancel).await;
        self.finish(state, !finished)
    }

    /// Dispatch batches in input order. Returns `false` when cancellation
    /// stopped dispatch before the last batch.
    async fn process_batches(
        &self,
        organizations: Vec<OrganizationSummary>,
        state: &mut RunState,
        cancel: &CancellationToken,
    ) -> bool {
        let mut rate_limited_streak = 0u32;
        let mut batches = organizations.chunks(self.config.batch_size).peekable();

        while let Some(batch) = batches.next() {
            if cancel.is_cancelled() {
                tracing::warn!(completed = state.completed(), "cancelled, no further batches dispatched");
                return false;
            }

            let rate_limited = self.process_batch(batch, state).await;

            if batches.peek().is_some() {
                rate_limited_streak = if rate_limited { rate_limited_streak + 1 } else { 0 };
                let delay = self.batch_pause(rate_limited_streak);
                if rate_limited_streak > 0 {
                    tracing::warn!(?delay, streak = rate_limited_streak, "rate limited, slowing down");
                }
                if !pause(delay, cancel).await {
                    return false;
                }
            }
        }
        true
    }

    /// Run one batch to completion. Returns whether any member was rate
    /// limited.
    async fn process_batch(&self, batch: &[OrganizationSummary], state: &mut RunState) -> bool {
        let mut pending: FuturesUnordered<_> = batch
            .iter()
            .map(|org| self.process_organization_guarded(org))
            .collect();

        let mut rate_limited = false;
        while let Some(record) = pending.next().await {
            rate_limited |= record.result.error == Some(ErrorKind::RateLimit);

            let completed = state.record(record);
            if completed % self.config.snapshot_every == 0 {
                self.report(state);
            }
            if completed % self.config.log_every == 0 {
                self.log_progress(state);
            }
        }
        rate_limited
    }

    /// Never panics past the organization boundary.
    async fn process_organization_guarded(&self, summary: &OrganizationSummary) -> OrganizationRecord {
        match AssertUnwindSafe(self.process_organization(summary))
            .catch_unwind()
            .await
        {
            Ok(record) => record,
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(ein = %summary.ein, panic = %message, "unexpected failure processing organization");
                OrganizationRecord::new(
                    summary.ein,
                    summary.name.clone(),
                    None,
                    ExtractionResult::failed(ErrorKind::Unexpected),
                )
            }
        }
    }

    async fn process_organization(&self, summary: &OrganizationSummary) -> OrganizationRecord {
        let detail = {
            let Ok(_permit) = self.registry_permits.acquire().await else {
                return self.unexpected(summary);
            };
            self.registry.organization(summary.ein).await
        };

        let organization = match detail {
            Ok(organization) => organization,
            Err(e) => {
                let kind = match e {
                    RegistryError::RateLimited { .. } => ErrorKind::RateLimit,
                    _ => ErrorKind::RegistryFailed,
                };
                tracing::warn!(ein = %summary.ein, error = %e, "organization lookup failed");
                return OrganizationRecord::new(
                    summary.ein,
                    summary.name.clone(),
                    None,
                    ExtractionResult::failed(kind),
                );
            }
        };

        let name = if organization.name.trim().is_empty() {
            summary.name.clone()
        } else {
            organization.name.clone()
        };

        let selection = select_filing(&organization);
        let result = match (selection.decision, selection.filing) {
            (InlineDecision::InlineComplete | InlineDecision::InlinePartial, _) => {
                ExtractionResult::registry(selection.revenue, selection.compensation)
            }
            (InlineDecision::DocumentRequired, Some(filing)) => {
                let Ok(_permit) = self.document_permits.acquire().await else {
                    return self.unexpected(summary);
                };
                self.chain.extract(filing).await
            }
            (InlineDecision::DocumentRequired, None) | (InlineDecision::None, _) => {
                ExtractionResult::none(None)
            }
        };

        match result.error {
            Some(kind) => {
                tracing::warn!(ein = %summary.ein, year = selection.year, error = %kind, "no figures extracted")
            }
            None => tracing::debug!(
                ein = %summary.ein,
                year = selection.year,
                source = %result.source,
                revenue = ?result.revenue,
                "organization processed"
            ),
        }

        OrganizationRecord::new(
            summary.ein,
            name,
            selection.filing.map(|f| f.tax_year),
            result,
        )
    }

    fn unexpected(&self, summary: &OrganizationSummary) -> OrganizationRecord {
        OrganizationRecord::new(
            summary.ein,
            summary.name.clone(),
            None,
            ExtractionResult::failed(ErrorKind::Unexpected),
        )
    }

    /// Base pause, doubled for each consecutive rate-limited batch.
    fn batch_pause(&self, rate_limited_streak: u32) -> Duration {
        let base = self.config.batch_pause;
        if rate_limited_streak == 0 {
            return base;
        }
        base.saturating_mul(2u32.saturating_pow(rate_limited_streak))
            .min(self.config.max_batch_pause)
            .max(base)
    }

    fn report(&self, state: &RunState) {
        self.progress.report(&state.snapshot(&self.config));
    }

    fn log_progress(&self, state: &RunState) {
        let snapshot = state.snapshot(&self.config);
        tracing::info!(
            completed = snapshot.completed,
            total = snapshot.total,
            percent = format_args!("{:.1}", snapshot.percent_complete()),
            registry = snapshot.source_count(DataSource::Registry),
            ai = snapshot.source_count(DataSource::Ai),
            ocr = snapshot.source_count(DataSource::OcrFallback),
            errors = snapshot.source_count(DataSource::Error),
            rate_limited = snapshot.error_count(ErrorKind::RateLimit),
            "progress"
        );
    }

    fn finish(&self, state: RunState, interrupted: bool) -> RunReport {
        let snapshot = state.snapshot(&self.config);
        self.progress.report(&snapshot);

        tracing::info!(
            completed = snapshot.completed,
            total = snapshot.total,
            elapsed_secs = format_args!("{:.1}", snapshot.elapsed_secs),
            interrupted,
            "run finished"
        );
        for (source, count) in snapshot.by_source.iter().filter(|(_, c)| **c > 0) {
            tracing::info!(source = %source, count, "records by source");
        }
        for (kind, count) in snapshot.by_error.iter().filter(|(_, c)| **c > 0) {
            tracing::info!(error = %kind, count, "records by error");
        }

        RunReport {
            records: state.into_records(),
            snapshot,
            interrupted,
        }
    }
}
