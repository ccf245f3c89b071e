// Command-line entry point.
//
// Reads a feed from a file or URL, runs the reporting pipeline and hands the
// structured report to the sink picked with `--output`. Diagnostics go to
// stderr through `tracing`; only the report itself goes to stdout.
use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use covid_report::error::ReportError;
use covid_report::fetch::{read_source, CT_TOWNS_CSV_URL};
use covid_report::loader::{FeedFormat, SourceKind};
use covid_report::output::{ConsoleSink, CsvSink, JsonSink, ReportSink};
use covid_report::pipeline::{self, ReportOutcome};
use covid_report::types::{DateRange, FormatRules, RegionFilter, RegionLevel, ReportConfig, SortBy};
use covid_report::util::format_int;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// Daily report layout (Country/Region, Province/State, Last Update, ...)
    Daily,
    /// Connecticut cases and deaths by town
    CtTowns,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputKind {
    Table,
    Csv,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "covid-report")]
#[command(about = "Ranked COVID-19 case reports from daily feeds", long_about = None)]
struct Cli {
    /// Path to a CSV/JSON file or an http(s) URL (defaults to the Connecticut town feed)
    #[arg(value_name = "FILE_OR_URL")]
    source: Option<String>,

    /// Input layout: csv, tsv or json (sniffed from the payload when omitted)
    #[arg(long)]
    input_format: Option<SourceKind>,

    /// Column naming preset for the feed (daily, or ct-towns for the default feed)
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    /// Field delimiter for delimited input
    #[arg(long)]
    delimiter: Option<char>,

    /// Show only the first N regions (0 or negative = all)
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    top: Option<i64>,

    /// Metric to rank by
    #[arg(short, long, default_value = "confirmed")]
    sort_by: SortBy,

    /// Rank smallest first
    #[arg(long, default_value_t = false)]
    ascending: bool,

    /// Case-insensitive region name filter
    #[arg(short, long)]
    region: Option<String>,

    /// Require the region filter to match the whole name
    #[arg(long, default_value_t = false, requires = "region")]
    exact: bool,

    /// First date to consider (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last date to consider (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Only regions with more confirmed cases than this (10,000 for the default feed)
    #[arg(short = 'l', long)]
    min_confirmed: Option<u64>,

    /// Keep provinces/states as separate regions instead of rolling up
    #[arg(long, default_value_t = false)]
    by_subregion: bool,

    /// Report destination format
    #[arg(short, long, value_enum, default_value_t = OutputKind::Table)]
    output: OutputKind,

    /// Decimal places for the fatality ratio
    #[arg(long, default_value_t = 2)]
    precision: usize,
}

/// Confirmed-case threshold applied when no source is given.
const DEFAULT_CONFIRMED_LIMIT: u64 = 10_000;

impl Cli {
    fn source(&self) -> &str {
        self.source.as_deref().unwrap_or(CT_TOWNS_CSV_URL)
    }

    fn preset(&self) -> Preset {
        match (self.preset, &self.source) {
            (Some(preset), _) => preset,
            (None, None) => Preset::CtTowns,
            (None, Some(_)) => Preset::Daily,
        }
    }

    fn min_confirmed(&self) -> Option<u64> {
        match (self.min_confirmed, &self.source) {
            (None, None) => Some(DEFAULT_CONFIRMED_LIMIT),
            (limit, _) => limit,
        }
    }

    fn report_config(&self) -> ReportConfig {
        ReportConfig {
            top_n: self.top,
            sort_by: self.sort_by,
            region_filter: self.region.as_ref().map(|pattern| RegionFilter {
                pattern: pattern.clone(),
                exact: self.exact,
            }),
            date_range: DateRange {
                start: self.from,
                end: self.to,
            },
            ascending: self.ascending,
            min_confirmed: self.min_confirmed(),
            group_by: if self.by_subregion {
                RegionLevel::Subregion
            } else {
                RegionLevel::Country
            },
            format_rules: FormatRules {
                ratio_precision: self.precision,
                ..FormatRules::default()
            },
        }
    }

    fn feed_format(&self, payload: &str) -> Result<FeedFormat> {
        let kind = self.input_format.unwrap_or_else(|| SourceKind::sniff(payload));
        let kind = match (kind, self.delimiter) {
            (SourceKind::Json, Some(_)) => bail!("--delimiter cannot be used with JSON input"),
            (SourceKind::Delimited { .. }, Some(c)) => {
                let Ok(delimiter) = u8::try_from(c) else {
                    bail!("delimiter must be a single-byte character, got '{c}'");
                };
                SourceKind::Delimited { delimiter }
            }
            (kind, None) => kind,
        };
        let format = match (self.preset(), kind) {
            (Preset::Daily, _) => FeedFormat::daily_report(),
            (Preset::CtTowns, SourceKind::Json) => FeedFormat::ct_towns_json(),
            (Preset::CtTowns, _) => FeedFormat::ct_towns(),
        };
        Ok(format.with_kind(kind))
    }
}

fn init_tracing() {
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    tracing_subscriber::registry().with(stderr_layer).init();
}

fn render(outcome: &ReportOutcome, kind: OutputKind) -> Result<()> {
    let stdout = io::stdout();
    match kind {
        OutputKind::Table => {
            let text = ConsoleSink.accept(&outcome.report)?;
            writeln!(stdout.lock(), "{text}")?;
        }
        OutputKind::Json => {
            let text = JsonSink.accept(&outcome.report)?;
            writeln!(stdout.lock(), "{text}")?;
        }
        OutputKind::Csv => {
            CsvSink::new(stdout.lock()).accept(&outcome.report)?;
        }
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let payload = read_source(cli.source())?;
    let format = cli.feed_format(&payload)?;
    let config = cli.report_config();

    let outcome = pipeline::run(&payload, &format, &config)?;
    info!(
        "Processing dataset... ({} rows read, {} regions)",
        format_int(outcome.rows_read),
        format_int(outcome.regions_total)
    );
    if !outcome.failures.is_empty() {
        warn!(
            skipped = outcome.failures.len(),
            "Rows skipped due to parse/validation errors"
        );
    }
    render(&outcome, cli.output)
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<ReportError>() {
            Some(ReportError::NoMatchingRegions) => {
                println!("No data for the given filters.");
                ExitCode::SUCCESS
            }
            Some(report_err) => {
                error!("{report_err}");
                ExitCode::from(report_err.exit_code())
            }
            None => {
                error!("{e:#}");
                ExitCode::FAILURE
            }
        },
    }
}
