//! Derived metrics per region and date.

use crate::types::{MetricPoint, RegionId, RegionMetrics, RegionSeries};
use std::collections::BTreeMap;

/// `deaths / confirmed`, undefined while nothing is confirmed.
pub fn fatality_ratio(deaths: u64, confirmed: u64) -> Option<f64> {
    if confirmed == 0 {
        None
    } else {
        Some(deaths as f64 / confirmed as f64)
    }
}

fn delta(current: u64, previous: u64) -> i64 {
    // i128 keeps the subtraction exact before clamping into i64.
    let d = current as i128 - previous as i128;
    d.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Walk a series in date order and compute one point per date.
///
/// The first point's deltas equal its cumulative values. Later deltas are
/// differences against the previous date and stay negative when a feed
/// correction lowered a cumulative count.
pub fn compute_metrics(series: &RegionSeries) -> RegionMetrics {
    let points = series
        .records()
        .iter()
        .scan(None::<(u64, u64, u64)>, |prev, r| {
            let (pc, pd, pr) = prev.unwrap_or((0, 0, 0));
            *prev = Some((r.confirmed(), r.deaths(), r.recovered()));
            Some(MetricPoint {
                date: r.date(),
                confirmed: r.confirmed(),
                deaths: r.deaths(),
                recovered: r.recovered(),
                new_confirmed: delta(r.confirmed(), pc),
                new_deaths: delta(r.deaths(), pd),
                new_recovered: delta(r.recovered(), pr),
                fatality_ratio: fatality_ratio(r.deaths(), r.confirmed()),
            })
        })
        .collect();
    RegionMetrics {
        region: series.region().clone(),
        points,
    }
}

/// Metrics for every series, in region order.
pub fn compute_all(series: &BTreeMap<RegionId, RegionSeries>) -> Vec<RegionMetrics> {
    series.values().map(compute_metrics).collect()
}
