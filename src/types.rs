use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Bucket name for records whose region column was empty.
pub const UNSPECIFIED_REGION: &str = "Unspecified";

/// Geographic key of an observation: a country plus an optional subregion
/// (province, state, town...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RegionId {
    pub country: String,
    pub subregion: Option<String>,
}

impl RegionId {
    /// Build a region key, normalizing blanks: an empty country becomes
    /// [`UNSPECIFIED_REGION`] and an empty subregion becomes `None`.
    pub fn new(country: &str, subregion: Option<&str>) -> Self {
        let country = country.trim();
        let country = if country.is_empty() {
            UNSPECIFIED_REGION.to_string()
        } else {
            country.to_string()
        };
        let subregion = subregion
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self { country, subregion }
    }

    pub fn country(country: &str) -> Self {
        Self::new(country, None)
    }

    /// Project this key onto the requested grouping level.
    pub fn at_level(&self, level: RegionLevel) -> Self {
        match level {
            RegionLevel::Country => Self {
                country: self.country.clone(),
                subregion: None,
            },
            RegionLevel::Subregion => self.clone(),
        }
    }

    /// Human-readable label, also what the name filter matches against.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subregion {
            Some(sub) => write!(f, "{} / {}", self.country, sub),
            None => write!(f, "{}", self.country),
        }
    }
}

/// One parsed observation. Counts are cumulative as reported by the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseRecord {
    region: RegionId,
    date: NaiveDate,
    confirmed: u64,
    deaths: u64,
    recovered: u64,
}

impl CaseRecord {
    pub fn new(region: RegionId, date: NaiveDate, confirmed: u64, deaths: u64, recovered: u64) -> Self {
        Self {
            region,
            date,
            confirmed,
            deaths,
            recovered,
        }
    }

    pub fn region(&self) -> &RegionId {
        &self.region
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn confirmed(&self) -> u64 {
        self.confirmed
    }

    pub fn deaths(&self) -> u64 {
        self.deaths
    }

    pub fn recovered(&self) -> u64 {
        self.recovered
    }
}

/// A region's observations, one per date, dates strictly increasing.
///
/// Only the aggregator builds these; afterwards they are read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSeries {
    region: RegionId,
    records: Vec<CaseRecord>,
}

impl RegionSeries {
    pub(crate) fn from_sorted(region: RegionId, records: Vec<CaseRecord>) -> Self {
        debug_assert!(records.windows(2).all(|w| w[0].date < w[1].date));
        Self { region, records }
    }

    pub fn region(&self) -> &RegionId {
        &self.region
    }

    pub fn records(&self) -> &[CaseRecord] {
        &self.records
    }

    pub fn latest(&self) -> Option<&CaseRecord> {
        self.records.last()
    }
}

/// Derived metrics for one region on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    pub date: NaiveDate,
    pub confirmed: u64,
    pub deaths: u64,
    pub recovered: u64,
    pub new_confirmed: i64,
    pub new_deaths: i64,
    pub new_recovered: i64,
    /// `deaths / confirmed`; `None` when nothing is confirmed yet.
    pub fatality_ratio: Option<f64>,
}

/// All metric points of a region, in date order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionMetrics {
    pub region: RegionId,
    pub points: Vec<MetricPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub rank: usize,
    pub region: RegionId,
    pub point: MetricPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Confirmed,
    Deaths,
    Recovered,
    FatalityRatio,
    NewConfirmed,
    NewDeaths,
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirmed" => Ok(Self::Confirmed),
            "deaths" => Ok(Self::Deaths),
            "recovered" => Ok(Self::Recovered),
            "fatality-ratio" | "fatalityratio" | "cfr" => Ok(Self::FatalityRatio),
            "new-confirmed" => Ok(Self::NewConfirmed),
            "new-deaths" => Ok(Self::NewDeaths),
            other => Err(format!(
                "unknown sort metric '{other}' (expected confirmed, deaths, recovered, \
                 fatality-ratio, new-confirmed or new-deaths)"
            )),
        }
    }
}

/// Granularity regions are grouped at before aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegionLevel {
    /// Subregion rows roll up into their country.
    #[default]
    Country,
    Subregion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionFilter {
    pub pattern: String,
    /// Match the whole label instead of a substring. Always case-insensitive.
    pub exact: bool,
}

impl RegionFilter {
    pub fn substring(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            exact: false,
        }
    }

    pub fn matches(&self, region: &RegionId) -> bool {
        let label = region.label().to_lowercase();
        let pattern = self.pattern.to_lowercase();
        if self.exact {
            label == pattern
        } else {
            label.contains(&pattern)
        }
    }
}

/// Inclusive date window; an open bound matches everything on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// Presentation rules applied by the report formatter only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatRules {
    pub thousands_separator: bool,
    pub ratio_precision: usize,
    /// Render ratios as percentages (`2.50`) instead of fractions (`0.03`).
    pub ratio_as_percent: bool,
}

impl Default for FormatRules {
    fn default() -> Self {
        Self {
            thousands_separator: true,
            ratio_precision: 2,
            ratio_as_percent: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportConfig {
    /// Row limit; `None`, zero or negative means unlimited.
    pub top_n: Option<i64>,
    pub sort_by: SortBy,
    pub region_filter: Option<RegionFilter>,
    pub date_range: DateRange,
    pub ascending: bool,
    /// Keep only regions with strictly more confirmed cases than this.
    pub min_confirmed: Option<u64>,
    pub group_by: RegionLevel,
    pub format_rules: FormatRules,
}

impl ReportConfig {
    pub fn row_limit(&self) -> Option<usize> {
        match self.top_n {
            Some(n) if n > 0 => Some(usize::try_from(n).unwrap_or(usize::MAX)),
            _ => None,
        }
    }
}
