//! Discovery and extraction pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - EIN discovery (paginated search, global deduplication)
//! - Filing selection (latest filing, inline figures when available)
//! - The document fallback chain (AI, then text recovery and patterns)
//! - Batched, budgeted concurrency with progress snapshots

pub mod discovery;
pub mod fallback;
pub mod orchestrator;
pub mod select;
pub mod state;

pub use discovery::{search_terms, Discovery, TermEnd, TermOutcome};
pub use fallback::FallbackChain;
pub use orchestrator::{Orchestrator, RunReport};
pub use select::{select_filing, FilingSelection, InlineDecision};
pub use state::RunState;

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sleep unless cancelled. Returns `false` when cancellation cut the pause
/// short.
pub(crate) async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if duration.is_zero() {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
