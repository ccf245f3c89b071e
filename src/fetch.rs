//! Payload retrieval from a local path or an `http(s)` URL.
//!
//! This sits outside the reporting core: it only hands back text.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

/// Connecticut "COVID-19 Tests, Cases, and Deaths (By Town)" CSV export.
pub const CT_TOWNS_CSV_URL: &str = "https://data.ct.gov/api/views/28fr-iqnx/rows.csv?accessType=DOWNLOAD";

pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Read the whole payload into memory.
pub fn read_source(source: &str) -> Result<String> {
    if is_url(source) {
        info!(url = source, "Downloading feed");
        let body = reqwest::blocking::get(source)
            .with_context(|| format!("request to {source} failed"))?
            .error_for_status()
            .with_context(|| format!("{source} returned an error status"))?
            .text()
            .with_context(|| format!("could not read body from {source}"))?;
        Ok(body)
    } else {
        info!(path = source, "Reading feed file");
        std::fs::read_to_string(Path::new(source)).with_context(|| format!("could not read {source}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://data.ct.gov/resource/28fr-iqnx.json"));
        assert!(!is_url("data/feed.csv"));
    }

    #[test]
    fn test_read_local_file() {
        let path = format!("{}/covid_report_fetch_test.csv", env::temp_dir().display());
        fs::write(&path, "country,date,confirmed\n").unwrap();
        assert_eq!(read_source(&path).unwrap(), "country,date,confirmed\n");
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(read_source("/definitely/not/here.csv").is_err());
    }
}
