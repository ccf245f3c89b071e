// Parsing and formatting helpers.
//
// Cell-level cleanup of feed values lives here so the loader only deals with
// columns and rows, and the formatter only deals with layout.
use chrono::{NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Parse a cumulative count cell.
///
/// - Trims whitespace and strips thousands separators (`1,234`).
/// - An empty or missing cell counts as zero.
/// - Integral decimals such as `12.0` are accepted (some feeds export floats).
/// - A signed zero (`-0`) is zero.
/// - Negative values, exponent notation and text are rejected with a reason.
pub fn parse_count(s: Option<&str>) -> Result<u64, String> {
    let Some(raw) = s else { return Ok(0) };
    let s = raw.trim().replace(',', "");
    if s.is_empty() {
        return Ok(0);
    }
    let (negative, unsigned) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s.as_str())),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let digits_only = |p: &str| p.chars().all(|c| c.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !digits_only(int_part) || !digits_only(frac_part) {
        return Err(format!("non-numeric count '{raw}'"));
    }
    if frac_part.chars().any(|c| c != '0') {
        return Err(format!("non-integral count '{raw}'"));
    }
    let value = if int_part.is_empty() {
        0
    } else {
        int_part
            .parse::<u64>()
            .map_err(|_| format!("count out of range '{raw}'"))?
    };
    if negative && value != 0 {
        return Err(format!("negative count {raw}"));
    }
    Ok(value)
}

/// Parse a date cell against each pattern in turn, first as a plain date and
/// then as a date-time whose time part is discarded.
pub fn parse_date_with(s: &str, formats: &[String]) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    formats.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(s, fmt)
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(s, fmt).ok().map(|dt| dt.date()))
    })
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus `en` thousands separators, e.g. `1,234,567.89`.
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: u64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

/// Render a day-over-day delta with an explicit sign (`+50`, `-3`, `0`).
pub fn format_delta(n: i64, separators: bool) -> String {
    let body = if separators {
        format_int(n.unsigned_abs())
    } else {
        n.unsigned_abs().to_string()
    };
    match n.signum() {
        1 => format!("+{body}"),
        -1 => format!("-{body}"),
        _ => body,
    }
}
