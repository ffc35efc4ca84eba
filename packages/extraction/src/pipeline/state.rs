//! Run state owned by the orchestrator.
//!
//! Only the orchestrator's own task mutates this, between awaits, so it
//! needs no locking.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use crate::types::{
    config::PipelineConfig,
    organization::Ein,
    progress::ProgressSnapshot,
    result::{DataSource, ErrorKind, OrganizationRecord},
};

#[derive(Debug)]
pub struct RunState {
    started: Instant,
    seen: HashSet<Ein>,
    completed: usize,
    by_source: BTreeMap<DataSource, usize>,
    by_error: BTreeMap<ErrorKind, usize>,
    current_query: String,
    records: Vec<OrganizationRecord>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            seen: HashSet::new(),
            completed: 0,
            by_source: DataSource::ALL.iter().map(|s| (*s, 0)).collect(),
            by_error: ErrorKind::ALL.iter().map(|k| (*k, 0)).collect(),
            current_query: String::new(),
            records: Vec::new(),
        }
    }

    /// Global deduplication set.
    pub fn seen_mut(&mut self) -> &mut HashSet<Ein> {
        &mut self.seen
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.current_query = query.into();
    }

    /// Store a terminal record. Returns the completed count.
    pub fn record(&mut self, record: OrganizationRecord) -> usize {
        *self.by_source.entry(record.result.source).or_insert(0) += 1;
        if let Some(kind) = record.result.error {
            *self.by_error.entry(kind).or_insert(0) += 1;
        }
        self.records.push(record);
        self.completed += 1;
        self.completed
    }

    /// Organizations discovered so far.
    pub fn total(&self) -> usize {
        self.seen.len()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn records(&self) -> &[OrganizationRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<OrganizationRecord> {
        self.records
    }

    pub fn snapshot(&self, config: &PipelineConfig) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total(),
            completed: self.completed,
            by_source: self.by_source.clone(),
            by_error: self.by_error.clone(),
            current_query: self.current_query.clone(),
            elapsed_secs: self.started.elapsed().as_secs_f64(),
            jurisdiction: config.jurisdiction.clone(),
            parsing_method: config.parsing_method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::result::ExtractionResult;

    #[test]
    fn test_counters() {
        let config = PipelineConfig::new("VT").unwrap();
        let mut state = RunState::new();
        state.seen_mut().extend([Ein(1), Ein(2), Ein(3)]);
        state.set_query("library");

        state.record(OrganizationRecord::new(
            Ein(1),
            "A",
            Some(2020),
            ExtractionResult::registry(Some(1.0), Some(2.0)),
        ));
        let completed = state.record(OrganizationRecord::new(
            Ein(2),
            "B",
            None,
            ExtractionResult::failed(ErrorKind::RegistryFailed),
        ));
        assert_eq!(completed, 2);

        let snapshot = state.snapshot(&config);
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.completed, 2);
        assert_eq!(snapshot.source_count(DataSource::Registry), 1);
        assert_eq!(snapshot.source_count(DataSource::Error), 1);
        assert_eq!(snapshot.source_count(DataSource::Ai), 0);
        assert_eq!(snapshot.error_count(ErrorKind::RegistryFailed), 1);
        assert_eq!(snapshot.current_query, "library");
        assert_eq!(snapshot.jurisdiction, "VT");
        assert!((snapshot.percent_complete() - 66.666).abs() < 0.01);
    }
}
