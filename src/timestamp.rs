//! Timestamp and tolerance parsing for commitment verification

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::error::CliError;
use crate::models::ObjectRecord;

/// Tolerance used when `--timestamp-tol` is not given
pub const DEFAULT_TOLERANCE: &str = "1s";

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse a commitment timestamp.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.frac][+HH:MM]`, a bare date, or
/// integer Unix seconds. Values without an offset are taken as UTC.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, CliError> {
    let s = input.trim();
    let invalid = || {
        CliError::usage(format!(
            "Invalid timestamp value: '{}'. \
             Use RFC 3339, 'YYYY-MM-DD HH:MM:SS+00:00' or Unix seconds.",
            input
        ))
    };

    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        let secs: i64 = s.parse().map_err(|_| invalid())?;
        return DateTime::from_timestamp(secs, 0).ok_or_else(invalid);
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(s, fmt) {
            return Ok(ts.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ts) = date.and_hms_opt(0, 0, 0) {
            return Ok(ts.and_utc());
        }
    }

    Err(invalid())
}

/// Render a timestamp the way the CLI prints it; `parse_timestamp` reads it back.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.f+00:00").to_string()
}

/// Parse a tolerance such as `1s`, `500ms`, `1m30s` or `2.5h`.
///
/// A bare number is read as seconds.
pub fn parse_tolerance(input: &str) -> Result<Duration, CliError> {
    let invalid = || {
        CliError::usage(format!(
            "Invalid timestamp tolerance: '{}'. Use a duration such as 1s, 500ms or 2m.",
            input
        ))
    };

    let s = input.trim();
    if s.is_empty() {
        return Err(invalid());
    }

    let mut total_nanos = 0f64;
    let mut terms = 0usize;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(invalid());
        }
        let value: f64 = rest[..num_len].parse().map_err(|_| invalid())?;
        rest = rest[num_len..].trim_start();

        let unit_len = rest
            .find(|c: char| !c.is_alphabetic())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = rest[unit_len..].trim_start();

        // bare number: seconds, only when it is the whole input
        let scale = match unit {
            "" if rest.is_empty() && terms == 0 => 1e9,
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" | "sec" => 1e9,
            "m" | "min" => 60e9,
            "h" => 3_600e9,
            "d" => 86_400e9,
            _ => return Err(invalid()),
        };
        total_nanos += value * scale;
        terms += 1;
    }

    if !total_nanos.is_finite() || total_nanos > i64::MAX as f64 {
        return Err(invalid());
    }

    Ok(Duration::nanoseconds(total_nanos.round() as i64))
}

/// Absolute distance between two instants
pub fn distance(a: &DateTime<Utc>, b: &DateTime<Utc>) -> Duration {
    if a > b {
        *a - *b
    } else {
        *b - *a
    }
}

/// The record whose timestamp is closest to `target`
pub fn closest_record<'a>(
    records: &'a [ObjectRecord],
    target: &DateTime<Utc>,
) -> Option<&'a ObjectRecord> {
    records
        .iter()
        .min_by_key(|record| distance(&record.timestamp, target))
}
