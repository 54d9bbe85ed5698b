use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::domain::ValidationResult;
use crate::error::{RecastError, Result};
use crate::stats::CategoryStats;
use crate::validate::batch::BatchReport;

/// Exported form of a batch run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationReport {
    pub timestamp: String,
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub success_rate: f64,
    pub skipped: u64,
    pub by_category: BTreeMap<String, CategoryStats>,
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn from_batch(batch: &BatchReport) -> Self {
        let s = &batch.stats;
        Self {
            timestamp: now_rfc3339(),
            total: s.total,
            passed: s.successful,
            failed: s.failed,
            success_rate: s.success_rate,
            skipped: s.skipped,
            by_category: s.by_category.clone(),
            results: batch.results.clone(),
        }
    }
}

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Write any report as pretty JSON.
pub fn export_report<T: Serialize>(report: &T, path: &Path) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut w, report)
        .map_err(|e| RecastError::Format(format!("report encode: {e}")))?;
    w.write_all(b"\n")?;
    w.flush()?;
    Ok(())
}
