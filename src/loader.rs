//! Record parser: raw feed text to typed [`CaseRecord`]s.
//!
//! The feed shape is described by a [`FeedFormat`] value instead of being
//! hard-coded, so a new feed only needs a new descriptor. Bad rows are
//! collected as [`ParseFailure`]s and never abort the batch; only a payload
//! with no recognizable shape is fatal.

use crate::error::{ReportError, Result};
use crate::types::{CaseRecord, RegionId};
use crate::util::{parse_count, parse_date_with};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use serde_json::{Map, Value};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// How the payload is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Header line followed by delimited rows.
    Delimited { delimiter: u8 },
    /// A JSON array of flat objects.
    Json,
}

impl SourceKind {
    pub const CSV: SourceKind = SourceKind::Delimited { delimiter: b',' };

    /// Guess the layout from the first non-blank character.
    pub fn sniff(payload: &str) -> Self {
        match payload.trim_start().chars().next() {
            Some('[') => SourceKind::Json,
            _ => SourceKind::CSV,
        }
    }
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(SourceKind::CSV),
            "tsv" => Ok(SourceKind::Delimited { delimiter: b'\t' }),
            "json" => Ok(SourceKind::Json),
            other => Err(format!("unknown input format '{other}' (expected csv, tsv or json)")),
        }
    }
}

/// Accepted header names per field. Matching is case-insensitive and ignores
/// surrounding whitespace; the first alias present in the header wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub country: Vec<String>,
    pub subregion: Vec<String>,
    pub date: Vec<String>,
    pub confirmed: Vec<String>,
    pub deaths: Vec<String>,
    pub recovered: Vec<String>,
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Descriptor of one feed shape: layout, column names and date patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFormat {
    pub kind: SourceKind,
    pub columns: ColumnMap,
    pub date_formats: Vec<String>,
}

impl FeedFormat {
    /// Daily-report layout (country / province / date / counts), accepting
    /// both the JHU CSSE header spellings and plain lowercase names.
    pub fn daily_report() -> Self {
        Self {
            kind: SourceKind::CSV,
            columns: ColumnMap {
                country: names(&["Country/Region", "Country_Region", "country", "region"]),
                subregion: names(&["Province/State", "Province_State", "subregion", "province", "state"]),
                date: names(&["Last Update", "Last_Update", "date", "observation_date"]),
                confirmed: names(&["Confirmed", "confirmed", "cases"]),
                deaths: names(&["Deaths", "deaths"]),
                recovered: names(&["Recovered", "recovered"]),
            },
            date_formats: names(&[
                "%Y-%m-%d",
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%dT%H:%M:%S",
                "%m/%d/%Y",
                "%m/%d/%Y %H:%M",
                "%m/%d/%y %H:%M",
            ]),
        }
    }

    /// Connecticut "COVID-19 Tests, Cases, and Deaths (By Town)" CSV export.
    /// Towns are reported as top-level regions; the feed has no recoveries.
    pub fn ct_towns() -> Self {
        Self {
            kind: SourceKind::CSV,
            columns: ColumnMap {
                country: names(&["Town"]),
                subregion: Vec::new(),
                date: names(&["Last update date"]),
                confirmed: names(&["Confirmed cases"]),
                deaths: names(&["Confirmed deaths"]),
                recovered: Vec::new(),
            },
            date_formats: names(&["%m/%d/%Y", "%Y-%m-%d"]),
        }
    }

    /// The same Connecticut town feed in its SODA JSON shape.
    pub fn ct_towns_json() -> Self {
        Self {
            kind: SourceKind::Json,
            columns: ColumnMap {
                country: names(&["town"]),
                subregion: Vec::new(),
                date: names(&["lastupdatedate"]),
                confirmed: names(&["confirmedcases"]),
                deaths: names(&["confirmeddeaths"]),
                recovered: Vec::new(),
            },
            date_formats: names(&["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d"]),
        }
    }

    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.kind = kind;
        self
    }
}

impl Default for FeedFormat {
    fn default() -> Self {
        Self::daily_report()
    }
}

/// A dropped row and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseFailure {
    /// Physical line for delimited text (header is line 1), element index
    /// (1-based) for JSON.
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub records: Vec<CaseRecord>,
    pub failures: Vec<ParseFailure>,
    pub rows_read: usize,
}

impl ParsedBatch {
    fn push(&mut self, line: u64, row: std::result::Result<CaseRecord, String>) {
        self.rows_read += 1;
        match row {
            Ok(record) => self.records.push(record),
            Err(reason) => {
                warn!(line, %reason, "Skipping malformed row");
                self.failures.push(ParseFailure { line, reason });
            }
        }
    }
}

/// Parse a whole payload.
///
/// Returns `MalformedSource` when the payload has no usable shape. Every
/// other problem is reported per row in [`ParsedBatch::failures`].
pub fn parse_records(payload: &str, format: &FeedFormat) -> Result<ParsedBatch> {
    if payload.trim().is_empty() {
        return Err(ReportError::MalformedSource("payload is empty".to_string()));
    }
    let batch = match format.kind {
        SourceKind::Delimited { delimiter } => parse_delimited(payload, delimiter, format)?,
        SourceKind::Json => parse_json(payload, format)?,
    };
    info!(
        rows = batch.rows_read,
        records = batch.records.len(),
        failures = batch.failures.len(),
        "Parsed payload"
    );
    Ok(batch)
}

/// Column positions resolved against an actual header.
struct Resolved {
    country: usize,
    subregion: Option<usize>,
    date: usize,
    confirmed: usize,
    deaths: Option<usize>,
    recovered: Option<usize>,
}

fn find_column(headers: &StringRecord, aliases: &[String]) -> Option<usize> {
    aliases.iter().find_map(|alias| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(alias.trim()))
    })
}

fn require_column(headers: &StringRecord, aliases: &[String], field: &str) -> Result<usize> {
    find_column(headers, aliases).ok_or_else(|| {
        ReportError::MalformedSource(format!(
            "header has no {field} column (looked for {})",
            aliases.join(", ")
        ))
    })
}

fn parse_delimited(payload: &str, delimiter: u8, format: &FeedFormat) -> Result<ParsedBatch> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .delimiter(delimiter)
        .from_reader(payload.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| ReportError::MalformedSource(format!("unreadable header: {e}")))?
        .clone();
    let cols = &format.columns;
    let resolved = Resolved {
        country: require_column(&headers, &cols.country, "region")?,
        subregion: find_column(&headers, &cols.subregion),
        date: require_column(&headers, &cols.date, "date")?,
        confirmed: require_column(&headers, &cols.confirmed, "confirmed")?,
        deaths: find_column(&headers, &cols.deaths),
        recovered: find_column(&headers, &cols.recovered),
    };
    debug!(?headers, "Resolved delimited header");

    let mut batch = ParsedBatch::default();
    for (idx, result) in rdr.records().enumerate() {
        // Header is line 1; fall back to the row index when csv has no position.
        let fallback = idx as u64 + 2;
        match result {
            Ok(record) => {
                let line = record.position().map_or(fallback, |p| p.line());
                batch.push(line, delimited_row(&record, &resolved, format));
            }
            Err(e) => {
                let line = e.position().map_or(fallback, |p| p.line());
                batch.push(line, Err(format!("unreadable row: {e}")));
            }
        }
    }
    Ok(batch)
}

fn delimited_row(
    record: &StringRecord,
    cols: &Resolved,
    format: &FeedFormat,
) -> std::result::Result<CaseRecord, String> {
    let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i));
    build_record(
        cell(Some(cols.country)),
        cell(cols.subregion),
        cell(Some(cols.date)),
        cell(Some(cols.confirmed)),
        cell(cols.deaths),
        cell(cols.recovered),
        format,
    )
}

fn parse_json(payload: &str, format: &FeedFormat) -> Result<ParsedBatch> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|e| ReportError::MalformedSource(format!("invalid JSON: {e}")))?;
    let Value::Array(items) = value else {
        return Err(ReportError::MalformedSource(
            "JSON payload is not an array of records".to_string(),
        ));
    };
    if !items.is_empty() && !items.iter().any(Value::is_object) {
        return Err(ReportError::MalformedSource(
            "JSON array contains no objects".to_string(),
        ));
    }
    ensure_json_shape(&items, &format.columns)?;

    let mut batch = ParsedBatch::default();
    for (idx, item) in items.iter().enumerate() {
        let line = idx as u64 + 1;
        let row = match item {
            Value::Object(obj) => json_row(obj, format),
            _ => Err("element is not an object".to_string()),
        };
        batch.push(line, row);
    }
    Ok(batch)
}

/// JSON counterpart of the header check: at least one object must carry the
/// region, date and confirmed keys, otherwise the feed is the wrong shape.
fn ensure_json_shape(items: &[Value], cols: &ColumnMap) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }
    let required = [
        ("region", &cols.country),
        ("date", &cols.date),
        ("confirmed", &cols.confirmed),
    ];
    let recognized = items.iter().filter_map(Value::as_object).any(|obj| {
        required
            .iter()
            .all(|(_, aliases)| json_field(obj, aliases).is_some())
    });
    if recognized {
        return Ok(());
    }
    let missing: Vec<String> = required
        .iter()
        .filter(|(_, aliases)| {
            !items
                .iter()
                .filter_map(Value::as_object)
                .any(|obj| json_field(obj, aliases).is_some())
        })
        .map(|(field, aliases)| format!("{field} ({})", aliases.join(", ")))
        .collect();
    let detail = if missing.is_empty() {
        "no object has region, date and confirmed keys together".to_string()
    } else {
        format!("no object has a key for {}", missing.join("; "))
    };
    Err(ReportError::MalformedSource(detail))
}

fn json_field<'a>(obj: &'a Map<String, Value>, aliases: &[String]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        obj.iter()
            .find(|(k, _)| k.trim().eq_ignore_ascii_case(alias.trim()))
            .map(|(_, v)| v)
    })
}

/// Flatten a scalar JSON value to the text a CSV cell would hold.
fn json_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn json_row(obj: &Map<String, Value>, format: &FeedFormat) -> std::result::Result<CaseRecord, String> {
    let cols = &format.columns;
    let text = |aliases: &[String]| json_text(json_field(obj, aliases));
    let country = text(&cols.country);
    let subregion = text(&cols.subregion);
    let date = text(&cols.date);
    let confirmed = text(&cols.confirmed);
    let deaths = text(&cols.deaths);
    let recovered = text(&cols.recovered);
    build_record(
        country.as_deref(),
        subregion.as_deref(),
        date.as_deref(),
        confirmed.as_deref(),
        deaths.as_deref(),
        recovered.as_deref(),
        format,
    )
}

fn build_record(
    country: Option<&str>,
    subregion: Option<&str>,
    date: Option<&str>,
    confirmed: Option<&str>,
    deaths: Option<&str>,
    recovered: Option<&str>,
    format: &FeedFormat,
) -> std::result::Result<CaseRecord, String> {
    let raw_date = date.unwrap_or("").trim();
    if raw_date.is_empty() {
        return Err("missing date".to_string());
    }
    let date = parse_date_with(raw_date, &format.date_formats)
        .ok_or_else(|| format!("unrecognized date '{raw_date}'"))?;
    let confirmed = parse_count(confirmed).map_err(|e| format!("confirmed: {e}"))?;
    let deaths = parse_count(deaths).map_err(|e| format!("deaths: {e}"))?;
    let recovered = parse_count(recovered).map_err(|e| format!("recovered: {e}"))?;
    let region = RegionId::new(country.unwrap_or(""), subregion);
    Ok(CaseRecord::new(region, date, confirmed, deaths, recovered))
}
