//! Progress reporting trait.

use crate::types::progress::ProgressSnapshot;

/// Receives run snapshots.
///
/// Called from the orchestrator between awaits; implementations should not
/// block for long.
pub trait ProgressSink: Send + Sync {
    fn report(&self, snapshot: &ProgressSnapshot);
}

/// Sink that discards every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn report(&self, _snapshot: &ProgressSnapshot) {}
}
