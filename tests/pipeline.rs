use chrono::NaiveDate;
use covid_report::error::ReportError;
use covid_report::loader::{FeedFormat, SourceKind};
use covid_report::output::{ConsoleSink, CsvSink, ReportSink};
use covid_report::pipeline::run;
use covid_report::reports::UNDEFINED_RATIO;
use covid_report::types::{DateRange, RegionFilter, RegionLevel, ReportConfig, SortBy};

const DAILY: &str = include_str!("fixtures/daily_report.csv");
const CT_TOWNS: &str = include_str!("fixtures/ct_towns.json");

fn region_column(rows: &[Vec<String>]) -> Vec<&str> {
    rows.iter().map(|r| r[1].as_str()).collect()
}

#[test]
fn test_full_daily_report() {
    let outcome = run(DAILY, &FeedFormat::daily_report(), &ReportConfig::default()).unwrap();

    assert_eq!(outcome.rows_read, 13);
    assert_eq!(outcome.failures.len(), 2);
    assert_eq!(outcome.failures[0].line, 12);
    assert_eq!(outcome.failures[1].line, 13);
    assert_eq!(outcome.regions_total, 6);

    let report = &outcome.report;
    assert_eq!(
        region_column(&report.rows),
        vec!["Mainland China", "Italy", "Spain", "France", "Unspecified", "Monaco"]
    );

    let italy = &report.rows[1];
    assert_eq!(italy[3], "150");
    assert_eq!(italy[4], "+50");
    assert_eq!(italy[5], "12");
    assert_eq!(italy[6], "+2");

    let spain = &report.rows[2];
    assert_eq!(spain[4], "-6");

    let france = &report.rows[3];
    assert_eq!(france[3], "60");
    assert_eq!(france[4], "+10");
}

#[test]
fn test_top_n_and_summary_over_displayed_rows() {
    let config = ReportConfig {
        top_n: Some(3),
        ..Default::default()
    };
    let outcome = run(DAILY, &FeedFormat::daily_report(), &config).unwrap();
    assert_eq!(outcome.report.rows.len(), 3);
    assert_eq!(outcome.report.summary[1], "Total (3 regions)");
    assert_eq!(outcome.report.summary[3], "68,717");
}

#[test]
fn test_date_range_picks_latest_point_inside() {
    let config = ReportConfig {
        date_range: DateRange {
            start: None,
            end: NaiveDate::from_ymd_opt(2020, 3, 2),
        },
        ..Default::default()
    };
    let outcome = run(DAILY, &FeedFormat::daily_report(), &config).unwrap();
    let spain = outcome
        .report
        .rows
        .iter()
        .find(|r| r[1] == "Spain")
        .unwrap();
    assert_eq!(spain[2], "2020-03-02");
    assert_eq!(spain[3], "120");
}

#[test]
fn test_subregion_grouping() {
    let config = ReportConfig {
        group_by: RegionLevel::Subregion,
        region_filter: Some(RegionFilter::substring("fra")),
        ..Default::default()
    };
    let outcome = run(DAILY, &FeedFormat::daily_report(), &config).unwrap();
    assert_eq!(region_column(&outcome.report.rows), vec!["France", "France / Corsica"]);
}

#[test]
fn test_filter_matching_nothing() {
    let config = ReportConfig {
        region_filter: Some(RegionFilter::substring("zz")),
        ..Default::default()
    };
    let err = run(DAILY, &FeedFormat::daily_report(), &config).unwrap_err();
    assert!(matches!(err, ReportError::NoMatchingRegions));
}

#[test]
fn test_header_only_payload_is_empty_input() {
    let err = run(
        "Country/Region,Last Update,Confirmed\n",
        &FeedFormat::daily_report(),
        &ReportConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ReportError::EmptyInput));
}

#[test]
fn test_all_rows_bad_is_empty_input() {
    let payload = "country,date,confirmed\nItaly,never,1\n";
    let err = run(payload, &FeedFormat::daily_report(), &ReportConfig::default()).unwrap_err();
    assert!(matches!(err, ReportError::EmptyInput));
}

#[test]
fn test_unrecognized_shape_is_malformed() {
    let err = run("hello world\n", &FeedFormat::daily_report(), &ReportConfig::default()).unwrap_err();
    assert!(matches!(err, ReportError::MalformedSource(_)));
}

#[test]
fn test_json_feed_with_wrong_preset_is_malformed() {
    let format = FeedFormat::daily_report().with_kind(SourceKind::Json);
    let err = run(CT_TOWNS, &format, &ReportConfig::default()).unwrap_err();
    assert!(matches!(err, ReportError::MalformedSource(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_ct_towns_json_with_confirmed_limit() {
    let config = ReportConfig {
        min_confirmed: Some(10_000),
        ..Default::default()
    };
    let outcome = run(CT_TOWNS, &FeedFormat::ct_towns_json(), &config).unwrap();
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].line, 6);
    assert_eq!(region_column(&outcome.report.rows), vec!["Avon"]);
    assert_eq!(outcome.report.rows[0][3], "10,450");
}

#[test]
fn test_ct_towns_zero_confirmed_has_undefined_ratio() {
    let config = ReportConfig {
        sort_by: SortBy::FatalityRatio,
        ..Default::default()
    };
    let outcome = run(CT_TOWNS, &FeedFormat::ct_towns_json(), &config).unwrap();
    let last = outcome.report.rows.last().unwrap();
    assert_eq!(last[1], "Ashford");
    assert_eq!(last[8], UNDEFINED_RATIO);

    let andover = outcome.report.rows.iter().find(|r| r[1] == "Andover").unwrap();
    assert_eq!(andover[4], "+4");
}

#[test]
fn test_reruns_are_byte_identical() {
    let config = ReportConfig {
        sort_by: SortBy::Deaths,
        ..Default::default()
    };
    let render = || {
        let outcome = run(DAILY, &FeedFormat::daily_report(), &config).unwrap();
        ConsoleSink.accept(&outcome.report).unwrap()
    };
    assert_eq!(render(), render());
}

#[test]
fn test_csv_sink_output() {
    let config = ReportConfig {
        top_n: Some(1),
        ..Default::default()
    };
    let outcome = run(DAILY, &FeedFormat::daily_report(), &config).unwrap();
    let mut sink = CsvSink::new(Vec::new());
    sink.accept(&outcome.report).unwrap();
    let text = String::from_utf8(sink.into_inner().unwrap()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Rank,Region,Date,Confirmed"));
    assert!(lines[1].starts_with("1,Mainland China,2020-03-02,\"68,453\""));
}
