//! Error taxonomy for report generation.
//!
//! Per-row parse problems are not errors: they are collected as
//! [`crate::loader::ParseFailure`] values next to the records that did parse.
//! Everything here aborts the report it was raised for.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    /// The payload has no recognizable shape (no header, wrong columns, not a JSON array).
    #[error("Malformed source: {0}")]
    MalformedSource(String),
    /// Parsing succeeded but produced no usable records.
    #[error("No valid records after parsing")]
    EmptyInput,
    /// Every region was excluded by the configured filters.
    #[error("No data for the given filters")]
    NoMatchingRegions,
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReportError {
    /// Process exit code the binary uses for this error.
    ///
    /// An empty filter result is a normal answer, so it exits cleanly.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::MalformedSource(_) => 2,
            Self::EmptyInput => 3,
            Self::NoMatchingRegions => 0,
            Self::Csv(_) | Self::Json(_) | Self::Io(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ReportError::MalformedSource("x".into()).exit_code(), 2);
        assert_eq!(ReportError::EmptyInput.exit_code(), 3);
        assert_eq!(ReportError::NoMatchingRegions.exit_code(), 0);
    }

    #[test]
    fn test_display_messages() {
        let e = ReportError::MalformedSource("missing column 'date'".into());
        assert_eq!(e.to_string(), "Malformed source: missing column 'date'");
        assert_eq!(
            ReportError::NoMatchingRegions.to_string(),
            "No data for the given filters"
        );
    }
}
