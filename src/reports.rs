use crate::metrics::fatality_ratio;
use crate::types::{FormatRules, ReportConfig, ReportRow, SortBy};
use crate::util::{format_delta, format_int, format_number};
use serde::Serialize;

pub const HEADERS: [&str; 9] = [
    "Rank",
    "Region",
    "Date",
    "Confirmed",
    "New Confirmed",
    "Deaths",
    "New Deaths",
    "Recovered",
    "Fatality %",
];

/// Rendered text for an undefined ratio.
pub const UNDEFINED_RATIO: &str = "n/a";

/// Sink-agnostic report: every cell is already formatted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Totals over the displayed rows, laid out like a data row.
    pub summary: Vec<String>,
    pub notes: Vec<String>,
}

#[derive(Debug, Default)]
struct Totals {
    confirmed: u64,
    new_confirmed: i64,
    deaths: u64,
    new_deaths: i64,
    recovered: u64,
}

fn count(n: u64, rules: &FormatRules) -> String {
    if rules.thousands_separator {
        format_int(n)
    } else {
        n.to_string()
    }
}

fn ratio(r: Option<f64>, rules: &FormatRules) -> String {
    match r {
        None => UNDEFINED_RATIO.to_string(),
        Some(v) => {
            let v = if rules.ratio_as_percent { v * 100.0 } else { v };
            format_number(v, rules.ratio_precision)
        }
    }
}

fn sort_label(sort_by: SortBy) -> &'static str {
    match sort_by {
        SortBy::Confirmed => "confirmed cases",
        SortBy::Deaths => "deaths",
        SortBy::Recovered => "recoveries",
        SortBy::FatalityRatio => "fatality ratio",
        SortBy::NewConfirmed => "new confirmed cases",
        SortBy::NewDeaths => "new deaths",
    }
}

/// Assemble the final report from ranked rows.
///
/// The summary totals only the rows passed in, i.e. what the reader sees,
/// not every region in the feed. Its ratio is total deaths over total
/// confirmed of those rows.
pub fn build_report(rows: &[ReportRow], config: &ReportConfig) -> Report {
    let rules = &config.format_rules;
    let sep = rules.thousands_separator;

    let mut totals = Totals::default();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            let p = &row.point;
            totals.confirmed = totals.confirmed.saturating_add(p.confirmed);
            totals.new_confirmed = totals.new_confirmed.saturating_add(p.new_confirmed);
            totals.deaths = totals.deaths.saturating_add(p.deaths);
            totals.new_deaths = totals.new_deaths.saturating_add(p.new_deaths);
            totals.recovered = totals.recovered.saturating_add(p.recovered);
            vec![
                row.rank.to_string(),
                row.region.label(),
                p.date.format("%Y-%m-%d").to_string(),
                count(p.confirmed, rules),
                format_delta(p.new_confirmed, sep),
                count(p.deaths, rules),
                format_delta(p.new_deaths, sep),
                count(p.recovered, rules),
                ratio(p.fatality_ratio, rules),
            ]
        })
        .collect();

    let summary = vec![
        String::new(),
        match rows.len() {
            1 => "Total (1 region)".to_string(),
            n => format!("Total ({n} regions)"),
        },
        String::new(),
        count(totals.confirmed, rules),
        format_delta(totals.new_confirmed, sep),
        count(totals.deaths, rules),
        format_delta(totals.new_deaths, sep),
        count(totals.recovered, rules),
        ratio(fatality_ratio(totals.deaths, totals.confirmed), rules),
    ];

    let direction = if config.ascending { "ascending" } else { "descending" };
    let mut notes = vec![format!(
        "Sorted by {} ({direction}); totals cover displayed rows only.",
        sort_label(config.sort_by)
    )];
    if let Some(limit) = config.row_limit() {
        notes.push(format!("Limited to top {limit}."));
    }
    if let Some(min) = config.min_confirmed {
        notes.push(format!("Regions with more than {} confirmed cases.", count(min, rules)));
    }

    Report {
        title: "COVID-19 Case Report".to_string(),
        headers: HEADERS.iter().map(|h| h.to_string()).collect(),
        rows: body,
        summary,
        notes,
    }
}
