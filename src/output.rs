//! Renderer sinks for a finished [`Report`].
//!
//! Each sink accepts the same structured report and produces its own output,
//! so the formatter never knows where the report ends up.

use crate::error::Result;
use crate::reports::Report;
use std::io::Write;
use tabled::builder::Builder;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};

pub trait ReportSink {
    type Output;

    fn accept(&mut self, report: &Report) -> Result<Self::Output>;
}

/// Markdown-style table for a terminal, returned as text.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    type Output = String;

    fn accept(&mut self, report: &Report) -> Result<String> {
        let mut builder = Builder::default();
        builder.push_record(report.headers.iter().cloned());
        for row in &report.rows {
            builder.push_record(row.iter().cloned());
        }
        builder.push_record(report.summary.iter().cloned());

        let mut table = builder.build();
        table
            .with(Style::markdown())
            .with(Modify::new(Columns::new(3..)).with(Alignment::right()));

        let mut out = String::new();
        out.push_str(&report.title);
        out.push_str("\n\n");
        out.push_str(&table.to_string());
        out.push('\n');
        for note in &report.notes {
            out.push_str(&format!("({})\n", note));
        }
        Ok(out)
    }
}

/// CSV rows (header, data, summary) written to any writer.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(inner),
        }
    }

    pub fn into_inner(self) -> Option<W> {
        self.writer.into_inner().ok()
    }
}

impl<W: Write> ReportSink for CsvSink<W> {
    type Output = ();

    fn accept(&mut self, report: &Report) -> Result<()> {
        self.writer.write_record(&report.headers)?;
        for row in &report.rows {
            self.writer.write_record(row)?;
        }
        self.writer.write_record(&report.summary)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Pretty JSON document of the whole report.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSink;

impl ReportSink for JsonSink {
    type Output = String;

    fn accept(&mut self, report: &Report) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }
}
