//! Load persisted per-series CSV files back into `AssembledSeries`.
//!
//! Design goals:
//! - **Strict schema**: `timestamp` and `value` columns are required
//! - **Tolerant timestamps**: RFC 3339 plus the space-separated forms older
//!   exports used
//! - **Same invariants as a fresh download**: rows are sorted and duplicate
//!   instants are rejected

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::StringRecord;

use crate::domain::{AssembledSeries, RawPoint, Resolution, SeriesId, SeriesKey};
use crate::error::{AppError, EXIT_INPUT};

/// `<data_dir>/<column_name>_<resolution>.csv`
pub fn series_file_path(data_dir: &Path, series: SeriesId, resolution: Resolution) -> PathBuf {
    data_dir.join(format!("{}_{}.csv", series.column_name(), resolution))
}

/// Read one series file.
///
/// Rows with an empty timestamp are dropped; an empty value cell is a null.
pub fn read_series_csv(path: &Path, key: SeriesKey) -> Result<AssembledSeries, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to open series CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to read CSV headers of '{}': {e}", path.display())))?
        .clone();
    let ts_idx = column_index(&headers, "timestamp", path)?;
    let value_idx = column_index(&headers, "value", path)?;

    let mut points = Vec::new();
    let mut dropped = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: header line, then 1-based numbering.
        let line = idx + 2;
        let record = result.map_err(|e| {
            AppError::new(EXIT_INPUT, format!("{}:{line}: CSV parse error: {e}", path.display()))
        })?;

        let raw_ts = record.get(ts_idx).unwrap_or("");
        if raw_ts.is_empty() {
            dropped += 1;
            continue;
        }
        let timestamp = parse_timestamp(raw_ts)
            .map_err(|e| AppError::new(EXIT_INPUT, format!("{}:{line}: {e}", path.display())))?;
        let value = parse_value(record.get(value_idx).unwrap_or(""))
            .map_err(|e| AppError::new(EXIT_INPUT, format!("{}:{line}: {e}", path.display())))?;

        points.push(RawPoint::new(timestamp, value));
    }

    if dropped > 0 {
        tracing::warn!(path = %path.display(), dropped, "dropped rows without timestamp");
    }

    points.sort_by_key(|p| p.timestamp);
    AssembledSeries::new(key, points, Vec::new())
        .map_err(|e| AppError::new(EXIT_INPUT, format!("{}: {e}", path.display())))
}

fn column_index(headers: &StringRecord, name: &str, path: &Path) -> Result<usize, AppError> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
        .ok_or_else(|| {
            AppError::new(
                EXIT_INPUT,
                format!("Missing required column `{name}` in '{}'", path.display()),
            )
        })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(dt.with_timezone(&Utc));
    }
    // Naive timestamps were always written in UTC.
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    Err(format!(
        "Invalid timestamp '{s}'. Expected RFC 3339, YYYY-MM-DD HH:MM:SS+HH:MM or YYYY-MM-DD HH:MM:SS (UTC)."
    ))
}

fn parse_value(s: &str) -> Result<Option<f64>, String> {
    if s.is_empty() {
        return Ok(None);
    }
    let v = s
        .parse::<f64>()
        .map_err(|_| format!("Invalid value '{s}'"))?;
    Ok(if v.is_finite() { Some(v) } else { None })
}
