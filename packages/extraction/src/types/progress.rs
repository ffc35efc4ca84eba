//! Point-in-time view of a run, handed to progress sinks.

use serde::Serialize;
use std::collections::BTreeMap;

use super::config::ParsingMethod;
use super::result::{DataSource, ErrorKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    /// Organizations discovered so far.
    pub total: usize,

    /// Organizations with a final record.
    pub completed: usize,

    pub by_source: BTreeMap<DataSource, usize>,
    pub by_error: BTreeMap<ErrorKind, usize>,

    /// Discovery term being worked on.
    pub current_query: String,

    pub elapsed_secs: f64,
    pub jurisdiction: String,
    pub parsing_method: ParsingMethod,
}

impl ProgressSnapshot {
    pub fn source_count(&self, source: DataSource) -> usize {
        self.by_source.get(&source).copied().unwrap_or(0)
    }

    pub fn error_count(&self, kind: ErrorKind) -> usize {
        self.by_error.get(&kind).copied().unwrap_or(0)
    }

    /// Completion percentage, 0 when nothing has been discovered.
    pub fn percent_complete(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}
