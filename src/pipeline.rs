//! One report-generation call: parse, aggregate, compute, rank, format.
//!
//! Row-level parse failures travel back with the report. Any later failure
//! aborts the call with no partial report.

use crate::aggregate::aggregate;
use crate::error::Result;
use crate::loader::{parse_records, FeedFormat, ParseFailure};
use crate::metrics::compute_all;
use crate::ranking::rank;
use crate::reports::{build_report, Report};
use crate::types::ReportConfig;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub report: Report,
    pub failures: Vec<ParseFailure>,
    pub rows_read: usize,
    /// Regions found in the feed before filtering.
    pub regions_total: usize,
}

pub fn run(payload: &str, format: &FeedFormat, config: &ReportConfig) -> Result<ReportOutcome> {
    let batch = parse_records(payload, format)?;
    let series = aggregate(&batch.records, config.group_by)?;
    let metrics = compute_all(&series);
    let rows = rank(&metrics, config)?;
    let report = build_report(&rows, config);
    info!(
        regions = series.len(),
        displayed = rows.len(),
        "Report generated"
    );
    Ok(ReportOutcome {
        report,
        failures: batch.failures,
        rows_read: batch.rows_read,
        regions_total: series.len(),
    })
}
