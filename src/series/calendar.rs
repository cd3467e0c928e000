//! Calendar fields used as aggregation keys.
//!
//! Only the local hour depends on the reference zone; it goes through the IANA
//! rules so DST transitions land on the right offset. All other fields are read
//! off the UTC instant.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use crate::domain::{CalendarFields, EnrichedRow, WideTable};
use crate::error::SeriesError;

pub const DEFAULT_TIMEZONE: &str = "Europe/Berlin";
pub const DEFAULT_BUCKET_MINUTES: i64 = 15;

#[derive(Debug, Clone)]
pub struct CalendarEnricher {
    tz: Tz,
    bucket: Duration,
}

impl CalendarEnricher {
    pub fn new(timezone: &str, bucket_minutes: i64) -> Result<Self, SeriesError> {
        let tz: Tz = timezone
            .trim()
            .parse()
            .map_err(|_| SeriesError::InvalidTimezone(timezone.to_string()))?;
        let bucket = Duration::try_minutes(bucket_minutes)
            .filter(|d| *d > Duration::zero())
            .ok_or_else(|| {
                SeriesError::InvalidParameter(format!(
                    "Bucket width must be a positive number of minutes, got {bucket_minutes}"
                ))
            })?;
        Ok(Self { tz, bucket })
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn fields(&self, timestamp: DateTime<Utc>) -> CalendarFields {
        let local = timestamp.with_timezone(&self.tz);

        CalendarFields {
            local_hour: local.hour(),
            date: timestamp.date_naive(),
            day_of_month: timestamp.day(),
            day_of_year: timestamp.ordinal(),
            iso_week: timestamp.iso_week().week(),
            month: timestamp.month(),
            year_month: format!("{:04}-{:02}", timestamp.year(), timestamp.month()),
            year: timestamp.year(),
            utc_hour: timestamp.hour(),
            weekday: weekday_name(timestamp.weekday()),
            bucket_start: self.bucket_start(timestamp),
        }
    }

    /// Floor to the bucket width on the millisecond axis, so every instant
    /// chrono can represent has a bucket.
    fn bucket_start(&self, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        let width = self.bucket.num_milliseconds();
        let floored = timestamp.timestamp_millis().div_euclid(width) * width;
        // Only the very first bucket before chrono's minimum can fall out of range.
        DateTime::from_timestamp_millis(floored).unwrap_or(timestamp)
    }

    /// Decorate every row of `table`. The table itself is left untouched.
    pub fn enrich(&self, table: &WideTable) -> Vec<EnrichedRow> {
        table
            .rows()
            .iter()
            .map(|row| EnrichedRow {
                timestamp: row.timestamp,
                values: row.values.clone(),
                calendar: self.fields(row.timestamp),
            })
            .collect()
    }
}

/// Enrich with the default 15-minute bucket width.
pub fn enrich(table: &WideTable, reference_timezone: &str) -> Result<Vec<EnrichedRow>, SeriesError> {
    Ok(CalendarEnricher::new(reference_timezone, DEFAULT_BUCKET_MINUTES)?.enrich(table))
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}
