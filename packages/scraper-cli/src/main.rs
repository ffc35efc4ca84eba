// Command-line entry point for the nonprofit filing scraper

mod config;
mod export;
mod monitor;

use anyhow::{Context, Result};
use clap::Parser;
use filing_extraction::{
    ai::GeminiExtractor,
    ingestors::HttpDocumentFetcher,
    registries::{ProPublicaRegistry, RegistryExt},
    security::AiCredentials,
    text::PdfTextExtractor,
    FallbackChain, Orchestrator, ParsingMethod, Registry,
};
use propublica_client::ProPublicaClient;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Args;
use crate::export::ExportSummary;
use crate::monitor::StatsFileMonitor;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads env fallbacks
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,filing_extraction=debug,nonprofit_scraper=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_line_number(true),
        )
        .init();

    let args = Args::parse();
    let config = args.pipeline_config()?;

    // Fail fast: no discovery without the credentials the run needs
    let credentials = match config.parsing_method {
        ParsingMethod::Ai => Some(
            AiCredentials::require(
                args.api_key.as_ref().map(|k| k.expose().to_string()),
                &args.model,
            )
            .context("AI parsing needs an API key (or use --parsing-method ocr)")?,
        ),
        ParsingMethod::Ocr => None,
    };

    tracing::info!(
        jurisdiction = %config.jurisdiction,
        name = %config.jurisdiction_name,
        method = %config.parsing_method,
        "Starting nonprofit scraper"
    );

    let registry = ProPublicaRegistry::new(ProPublicaClient::with_timeout(args.registry_timeout()));
    let registry: Arc<dyn Registry> = match args.registry_rps {
        Some(rps) => {
            tracing::info!(rps = rps.get(), "Registry quota enabled");
            Arc::new(registry.rate_limited(rps))
        }
        None => Arc::new(registry),
    };

    let mut chain = FallbackChain::new(
        Arc::new(HttpDocumentFetcher::with_timeout(args.document_timeout())),
        Arc::new(PdfTextExtractor::new()),
    );
    if let Some(credentials) = &credentials {
        tracing::info!(model = %credentials.model, "AI extraction enabled");
        chain = chain.with_ai(Arc::new(GeminiExtractor::from_credentials(credentials)));
    }

    let orchestrator = Orchestrator::new(registry, chain, config)
        .context("Failed to build pipeline")?
        .with_progress(Arc::new(StatsFileMonitor::new(&args.stats_file)));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing in-flight organizations");
                cancel.cancel();
            }
        }
    });

    let mut report = if args.eins.is_empty() {
        let terms = args.search_terms(orchestrator.config());
        tracing::info!(terms = terms.len(), "Discovering organizations");
        orchestrator.run(&terms, &cancel).await
    } else {
        tracing::info!(organizations = args.eins.len(), "Processing explicit EINs");
        orchestrator
            .process_organizations(args.explicit_organizations(), &cancel)
            .await
    };

    if report.interrupted {
        tracing::warn!(records = report.records.len(), "Run interrupted, exporting partial results");
    }

    let summary = ExportSummary::from_records(&report.records);
    let path = export::export_csv(
        &args.output_dir,
        &orchestrator.config().jurisdiction,
        orchestrator.config().parsing_method,
        &mut report.records,
    )?;
    tracing::info!(path = %path.display(), "Results exported");
    summary.log();

    Ok(())
}
