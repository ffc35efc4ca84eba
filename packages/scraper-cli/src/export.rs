//! CSV export and the end-of-run summary.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use filing_extraction::{sort_by_revenue, OrganizationRecord, ParsingMethod};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Organization Name")]
    name: &'a str,
    #[serde(rename = "EIN")]
    ein: String,
    #[serde(rename = "Filing Year")]
    filing_year: Option<i32>,
    #[serde(rename = "Total Revenue")]
    revenue: Option<String>,
    #[serde(rename = "Executive Compensation")]
    executive_compensation: Option<String>,
    #[serde(rename = "Data Source")]
    source: &'static str,
    #[serde(rename = "Error")]
    error: &'static str,
}

impl<'a> From<&'a OrganizationRecord> for CsvRow<'a> {
    fn from(record: &'a OrganizationRecord) -> Self {
        Self {
            name: &record.name,
            ein: format!("{:09}", record.ein.0),
            filing_year: record.filing_year,
            revenue: record.result.revenue.map(amount),
            executive_compensation: record.result.executive_compensation.map(amount),
            source: record.result.source.as_str(),
            error: record.result.error.map(|e| e.as_str()).unwrap_or(""),
        }
    }
}

fn amount(value: f64) -> String {
    format!("{value:.2}")
}

/// `nonprofit_data_<jurisdiction>_<method>_<timestamp>.csv`
pub fn export_filename(jurisdiction: &str, method: ParsingMethod, at: DateTime<Local>) -> String {
    format!(
        "nonprofit_data_{}_{}_{}.csv",
        jurisdiction,
        method,
        at.format("%Y%m%d_%H%M%S")
    )
}

/// Sort by revenue and write every record as one CSV row.
pub fn write_records<W: io::Write>(writer: W, records: &mut [OrganizationRecord]) -> Result<()> {
    sort_by_revenue(records);

    let mut csv = csv::Writer::from_writer(writer);
    for record in records.iter() {
        csv.serialize(CsvRow::from(record))
            .with_context(|| format!("Failed to write row for EIN {}", record.ein))?;
    }
    csv.flush().context("Failed to flush CSV")?;
    Ok(())
}

/// Write the export file into `dir`, returning its path.
pub fn export_csv(
    dir: &Path,
    jurisdiction: &str,
    method: ParsingMethod,
    records: &mut [OrganizationRecord],
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let path = dir.join(export_filename(jurisdiction, method, Local::now()));
    let file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    write_records(io::BufWriter::new(file), records)?;
    Ok(path)
}

/// Figures for the final log lines.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub organizations: usize,
    pub with_revenue: usize,
    pub with_compensation: usize,
    pub revenue_range: Option<(f64, f64)>,
    pub compensation_range: Option<(f64, f64)>,
}

impl ExportSummary {
    pub fn from_records(records: &[OrganizationRecord]) -> Self {
        let revenues: Vec<f64> = records.iter().filter_map(|r| r.result.revenue).collect();
        let compensation: Vec<f64> = records
            .iter()
            .filter_map(|r| r.result.executive_compensation)
            .collect();

        Self {
            organizations: records.len(),
            with_revenue: revenues.len(),
            with_compensation: compensation.len(),
            revenue_range: range(&revenues),
            compensation_range: range(&compensation),
        }
    }

    pub fn log(&self) {
        tracing::info!(
            organizations = self.organizations,
            with_revenue = self.with_revenue,
            with_compensation = self.with_compensation,
            "export summary"
        );
        if let Some((min, max)) = self.revenue_range {
            tracing::info!(min = %amount(min), max = %amount(max), "revenue range");
        }
        if let Some((min, max)) = self.compensation_range {
            tracing::info!(min = %amount(min), max = %amount(max), "executive compensation range");
        }
    }
}

fn range(values: &[f64]) -> Option<(f64, f64)> {
    values.iter().fold(None, |acc, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}
