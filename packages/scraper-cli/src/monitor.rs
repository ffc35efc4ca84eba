//! Stats file consumed by external dashboards.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use filing_extraction::{ProgressSink, ProgressSnapshot};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::runtime::{Handle, RuntimeFlavor};

#[derive(Serialize)]
struct StatsFile<'a> {
    updated_at: DateTime<Utc>,
    percent_complete: f64,
    #[serde(flatten)]
    snapshot: &'a ProgressSnapshot,
}

/// Rewrites a JSON stats file on every snapshot.
///
/// The file is written next to its final path and renamed into place, so
/// readers never observe a partial document.
pub struct StatsFileMonitor {
    path: PathBuf,
}

impl StatsFileMonitor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, snapshot: &ProgressSnapshot) -> Result<()> {
        let stats = StatsFile {
            updated_at: Utc::now(),
            percent_complete: snapshot.percent_complete(),
            snapshot,
        };
        let json = serde_json::to_vec_pretty(&stats).context("Failed to serialize stats")?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl ProgressSink for StatsFileMonitor {
    fn report(&self, snapshot: &ProgressSnapshot) {
        // On a multi-threaded runtime, hand this worker's other tasks to
        // another thread while the file is written
        let on_worker = Handle::try_current()
            .map(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread)
            .unwrap_or(false);
        let written = if on_worker {
            tokio::task::block_in_place(|| self.write(snapshot))
        } else {
            self.write(snapshot)
        };

        // A stale stats file must never stop the run
        if let Err(e) = written {
            tracing::warn!(path = %self.path.display(), error = %e, "stats file not updated");
        }
    }
}
