//! Time-series aggregation: records grouped by region, then by date.

use crate::error::{ReportError, Result};
use crate::types::{CaseRecord, RegionId, RegionLevel, RegionSeries};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Counts {
    confirmed: u64,
    deaths: u64,
    recovered: u64,
}

impl Counts {
    fn merge(self, r: &CaseRecord) -> Self {
        Self {
            confirmed: self.confirmed.saturating_add(r.confirmed()),
            deaths: self.deaths.saturating_add(r.deaths()),
            recovered: self.recovered.saturating_add(r.recovered()),
        }
    }
}

/// Group records into one series per region.
///
/// Rows sharing a (region, date) key are summed, so sub-region rows roll up
/// into their country when `level` is [`RegionLevel::Country`]. Each region is
/// reduced on its own and the results are combined at the end; nothing is
/// shared between regions while a series is built.
pub fn aggregate(records: &[CaseRecord], level: RegionLevel) -> Result<BTreeMap<RegionId, RegionSeries>> {
    if records.is_empty() {
        return Err(ReportError::EmptyInput);
    }

    let groups: BTreeMap<RegionId, Vec<&CaseRecord>> =
        records.iter().fold(BTreeMap::new(), |mut acc, r| {
            acc.entry(r.region().at_level(level)).or_default().push(r);
            acc
        });

    let series: BTreeMap<RegionId, RegionSeries> = groups
        .into_iter()
        .map(|(region, rows)| {
            let s = build_series(region.clone(), &rows);
            (region, s)
        })
        .collect();

    debug!(
        records = records.len(),
        regions = series.len(),
        "Aggregated records into series"
    );
    Ok(series)
}

fn build_series(region: RegionId, rows: &[&CaseRecord]) -> RegionSeries {
    let by_date: BTreeMap<NaiveDate, Counts> = rows.iter().fold(BTreeMap::new(), |mut acc, r| {
        let slot = acc.entry(r.date()).or_insert_with(Counts::default);
        *slot = slot.merge(r);
        acc
    });
    let records = by_date
        .into_iter()
        .map(|(date, c)| CaseRecord::new(region.clone(), date, c.confirmed, c.deaths, c.recovered))
        .collect();
    RegionSeries::from_sorted(region, records)
}
