//! CSV exports.
//!
//! - one file per assembled series (`timestamp,value`), the persisted artifact
//!   the table command reads back
//! - the aligned + enriched wide table, for spreadsheets or downstream scripts

use std::fs::create_dir_all;
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::domain::{AssembledSeries, EnrichedRow, SeriesId};
use crate::error::{AppError, EXIT_INPUT};

/// Write one series. Returns the number of data rows written.
///
/// With `drop_missing`, instants whose value is null are left out.
pub fn write_series_csv(path: &Path, series: &AssembledSeries, drop_missing: bool) -> Result<usize, AppError> {
    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create series CSV '{}': {e}", path.display())))?;

    writer
        .write_record(["timestamp", "value"])
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write series CSV header: {e}")))?;

    let mut written = 0usize;
    for p in series.points() {
        if drop_missing && p.value.is_none() {
            continue;
        }
        writer
            .write_record([fmt_timestamp(p.timestamp), fmt_value(p.value)])
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write series CSV row: {e}")))?;
        written += 1;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to flush '{}': {e}", path.display())))?;
    Ok(written)
}

/// Write the enriched wide table: timestamp, one column per series, then the
/// calendar fields.
pub fn write_enriched_csv(path: &Path, columns: &[SeriesId], rows: &[EnrichedRow]) -> Result<(), AppError> {
    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to create export CSV '{}': {e}", path.display())))?;

    let mut header = vec!["timestamp".to_string()];
    header.extend(columns.iter().map(|c| c.column_name()));
    header.extend(
        [
            "local_hour",
            "date",
            "day_of_month",
            "day_of_year",
            "week_of_year",
            "month_of_year",
            "year_month",
            "year",
            "hour_of_day",
            "day_of_week",
            "bucket_start",
        ]
        .map(str::to_string),
    );
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write export CSV header: {e}")))?;

    for row in rows {
        let c = &row.calendar;
        let mut record = Vec::with_capacity(header.len());
        record.push(fmt_timestamp(row.timestamp));
        record.extend(row.values.iter().map(|v| fmt_value(*v)));
        record.push(c.local_hour.to_string());
        record.push(c.date.to_string());
        record.push(c.day_of_month.to_string());
        record.push(c.day_of_year.to_string());
        record.push(c.iso_week.to_string());
        record.push(c.month.to_string());
        record.push(c.year_month.clone());
        record.push(c.year.to_string());
        record.push(c.utc_hour.to_string());
        record.push(c.weekday.to_string());
        record.push(fmt_timestamp(c.bucket_start));

        writer
            .write_record(&record)
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to flush '{}': {e}", path.display())))?;
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => create_dir_all(parent).map_err(|e| {
            AppError::new(
                EXIT_INPUT,
                format!("Failed to create directory '{}': {e}", parent.display()),
            )
        }),
        _ => Ok(()),
    }
}

/// Whole seconds print without a fraction; sub-second instants keep their digits.
fn fmt_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn fmt_value(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::fs::read_to_string;

    use super::*;
    use crate::domain::{RawPoint, Region, Resolution, SeriesKey};
    use crate::io::ingest::read_series_csv;
    use crate::series::{align, enrich};

    fn sample() -> AssembledSeries {
        let key = SeriesKey::new(SeriesId::new(410).unwrap(), Region::De, Resolution::QuarterHour);
        AssembledSeries::new(
            key,
            vec![
                RawPoint::new(DateTime::from_timestamp(1_672_531_200, 0).unwrap(), Some(12.5)),
                RawPoint::new(DateTime::from_timestamp(1_672_532_100, 0).unwrap(), None),
            ],
            Vec::new(),
        )
        .unwrap()
    }

    #[test]
    fn series_csv_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("electricity_consumption_quarterhour.csv");

        let rows = write_series_csv(&path, &sample(), false).unwrap();
        assert_eq!(rows, 2);
        assert_eq!(
            read_to_string(&path).unwrap(),
            "timestamp,value\n2023-01-01T00:00:00Z,12.5\n2023-01-01T00:15:00Z,\n"
        );

        let back = read_series_csv(&path, sample().key()).unwrap();
        assert_eq!(back.points(), sample().points());
    }

    #[test]
    fn millisecond_instants_stay_distinct_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ms.csv");
        let key = sample().key();
        let series = AssembledSeries::new(
            key,
            [(1000, 5.0), (1015, 6.5), (1030, 7.0)]
                .into_iter()
                .map(|(ms, v)| RawPoint::new(DateTime::from_timestamp_millis(ms).unwrap(), Some(v)))
                .collect(),
            Vec::new(),
        )
        .unwrap();

        assert_eq!(write_series_csv(&path, &series, false).unwrap(), 3);
        assert_eq!(
            read_to_string(&path).unwrap(),
            "timestamp,value\n1970-01-01T00:00:01Z,5\n1970-01-01T00:00:01.015Z,6.5\n1970-01-01T00:00:01.030Z,7\n"
        );

        let back = read_series_csv(&path, key).unwrap();
        assert_eq!(back.points(), series.points());
    }

    #[test]
    fn drop_missing_skips_null_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.csv");
        assert_eq!(write_series_csv(&path, &sample(), true).unwrap(), 1);
        assert_eq!(
            read_to_string(&path).unwrap(),
            "timestamp,value\n2023-01-01T00:00:00Z,12.5\n"
        );
    }

    #[test]
    fn enriched_csv_has_series_and_calendar_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let table = align(&[sample()]).unwrap();
        let rows = enrich(&table, "Europe/Berlin").unwrap();

        write_enriched_csv(&path, table.columns(), &rows).unwrap();
        let text = read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,electricity_consumption,local_hour,date,day_of_month,day_of_year,week_of_year,\
             month_of_year,year_month,year,hour_of_day,day_of_week,bucket_start"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2023-01-01T00:00:00Z,12.5,1,2023-01-01,1,1,52,1,2023-01,2023,0,Sunday,2023-01-01T00:00:00Z"
        );
        assert!(lines.next().unwrap().starts_with("2023-01-01T00:15:00Z,,1,"));
    }
}
