//! Region selection and ordering.

use crate::error::{ReportError, Result};
use crate::types::{MetricPoint, RegionMetrics, ReportConfig, ReportRow, SortBy};
use std::cmp::Ordering;
use tracing::debug;

/// Compare two points on the configured metric, largest first unless
/// `ascending`. Undefined fatality ratios always go last.
fn compare_metric(a: &MetricPoint, b: &MetricPoint, sort_by: SortBy, ascending: bool) -> Ordering {
    let directed = |o: Ordering| if ascending { o } else { o.reverse() };
    match sort_by {
        SortBy::Confirmed => directed(a.confirmed.cmp(&b.confirmed)),
        SortBy::Deaths => directed(a.deaths.cmp(&b.deaths)),
        SortBy::Recovered => directed(a.recovered.cmp(&b.recovered)),
        SortBy::NewConfirmed => directed(a.new_confirmed.cmp(&b.new_confirmed)),
        SortBy::NewDeaths => directed(a.new_deaths.cmp(&b.new_deaths)),
        SortBy::FatalityRatio => match (a.fatality_ratio, b.fatality_ratio) {
            (Some(x), Some(y)) => directed(x.total_cmp(&y)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

/// Filter, sort and truncate regions into ranked rows.
///
/// Steps run in a fixed order: date range (each region contributes its latest
/// point inside the range), name filter, confirmed-case threshold, sort with
/// ties broken by ascending region, then the `top_n` cut.
pub fn rank(regions: &[RegionMetrics], config: &ReportConfig) -> Result<Vec<ReportRow>> {
    let in_range = regions.iter().filter_map(|rm| {
        rm.points
            .iter()
            .rev()
            .find(|p| config.date_range.contains(p.date))
            .map(|p| (rm, p))
    });

    let mut selected: Vec<(&RegionMetrics, &MetricPoint)> = in_range
        .filter(|(rm, _)| {
            config
                .region_filter
                .as_ref()
                .map_or(true, |f| f.matches(&rm.region))
        })
        .filter(|(_, p)| config.min_confirmed.map_or(true, |min| p.confirmed > min))
        .collect();

    if selected.is_empty() {
        return Err(ReportError::NoMatchingRegions);
    }
    debug!(
        regions = regions.len(),
        selected = selected.len(),
        "Applied region filters"
    );

    selected.sort_by(|(ra, pa), (rb, pb)| {
        compare_metric(pa, pb, config.sort_by, config.ascending).then_with(|| ra.region.cmp(&rb.region))
    });

    if let Some(limit) = config.row_limit() {
        selected.truncate(limit);
    }

    Ok(selected
        .into_iter()
        .enumerate()
        .map(|(idx, (rm, p))| ReportRow {
            rank: idx + 1,
            region: rm.region.clone(),
            point: p.clone(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fatality_ratio;
    use crate::types::{DateRange, RegionFilter, RegionId};
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn point(date: &str, confirmed: u64, deaths: u64) -> MetricPoint {
        MetricPoint {
            date: d(date),
            confirmed,
            deaths,
            recovered: 0,
            new_confirmed: confirmed as i64,
            new_deaths: deaths as i64,
            new_recovered: 0,
            fatality_ratio: fatality_ratio(deaths, confirmed),
        }
    }

    fn region(name: &str, points: Vec<MetricPoint>) -> RegionMetrics {
        RegionMetrics {
            region: RegionId::country(name),
            points,
        }
    }

    fn names(rows: &[ReportRow]) -> Vec<String> {
        rows.iter().map(|r| r.region.label()).collect()
    }

    #[test]
    fn test_top_one_by_confirmed() {
        let regions = vec![
            region("A", vec![point("2020-03-01", 5, 0)]),
            region("B", vec![point("2020-03-01", 20, 0)]),
        ];
        let config = ReportConfig {
            sort_by: SortBy::Confirmed,
            top_n: Some(1),
            ..Default::default()
        };
        let rows = rank(&regions, &config).unwrap();
        assert_eq!(names(&rows), vec!["B"]);
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].point.confirmed, 20);
    }

    #[test]
    fn test_no_match_is_error() {
        let regions = vec![region("Italy", vec![point("2020-03-01", 5, 0)])];
        let config = ReportConfig {
            region_filter: Some(RegionFilter::substring("zz")),
            ..Default::default()
        };
        assert!(matches!(rank(&regions, &config), Err(ReportError::NoMatchingRegions)));
    }

    #[test]
    fn test_ties_break_by_region_ascending() {
        let regions = vec![
            region("Chile", vec![point("2020-03-01", 10, 0)]),
            region("Austria", vec![point("2020-03-01", 10, 0)]),
            region("Belgium", vec![point("2020-03-01", 10, 0)]),
        ];
        let desc = rank(&regions, &ReportConfig::default()).unwrap();
        assert_eq!(names(&desc), vec!["Austria", "Belgium", "Chile"]);
        let asc = rank(
            &regions,
            &ReportConfig {
                ascending: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(names(&asc), vec!["Austria", "Belgium", "Chile"]);
    }

    #[test]
    fn test_non_positive_top_n_is_unlimited() {
        let regions = vec![
            region("A", vec![point("2020-03-01", 1, 0)]),
            region("B", vec![point("2020-03-01", 2, 0)]),
            region("C", vec![point("2020-03-01", 3, 0)]),
        ];
        let unset = rank(&regions, &ReportConfig::default()).unwrap();
        for top_n in [Some(0), Some(-1)] {
            let config = ReportConfig {
                top_n,
                ..Default::default()
            };
            assert_eq!(rank(&regions, &config).unwrap(), unset);
        }
        assert_eq!(names(&unset), vec!["C", "B", "A"]);
    }

    #[test]
    fn test_date_range_uses_latest_point_in_range() {
        let regions = vec![
            region("A", vec![point("2020-03-01", 5, 0), point("2020-04-01", 50, 0)]),
            region("B", vec![point("2020-04-15", 9, 0)]),
        ];
        let config = ReportConfig {
            date_range: DateRange {
                start: Some(d("2020-03-01")),
                end: Some(d("2020-03-31")),
            },
            ..Default::default()
        };
        let rows = rank(&regions, &config).unwrap();
        assert_eq!(names(&rows), vec!["A"]);
        assert_eq!(rows[0].point.date, d("2020-03-01"));
        assert_eq!(rows[0].point.confirmed, 5);
    }

    #[test]
    fn test_undefined_ratio_sorts_last() {
        let regions = vec![
            region("Zero", vec![point("2020-03-01", 0, 0)]),
            region("Low", vec![point("2020-03-01", 100, 1)]),
            region("High", vec![point("2020-03-01", 100, 9)]),
        ];
        for ascending in [false, true] {
            let config = ReportConfig {
                sort_by: SortBy::FatalityRatio,
                ascending,
                ..Default::default()
            };
            let rows = rank(&regions, &config).unwrap();
            assert_eq!(rows.last().unwrap().region.label(), "Zero");
        }
    }

    #[test]
    fn test_min_confirmed_threshold_is_strict() {
        let regions = vec![
            region("A", vec![point("2020-03-01", 10_000, 0)]),
            region("B", vec![point("2020-03-01", 10_001, 0)]),
        ];
        let config = ReportConfig {
            min_confirmed: Some(10_000),
            ..Default::default()
        };
        assert_eq!(names(&rank(&regions, &config).unwrap()), vec!["B"]);
    }

    #[test]
    fn test_rerun_is_identical() {
        let regions: Vec<RegionMetrics> = ["Peru", "Oman", "Mali", "Laos"]
            .iter()
            .map(|n| region(n, vec![point("2020-03-01", 7, 1)]))
            .collect();
        let config = ReportConfig {
            sort_by: SortBy::Deaths,
            ..Default::default()
        };
        assert_eq!(rank(&regions, &config).unwrap(), rank(&regions, &config).unwrap());
    }
}
