//! Shared domain types.
//!
//! Identifiers (`SeriesId`, `Region`, `Resolution`) are closed: they can only be
//! constructed from values present in [`crate::domain::catalog`], so anything
//! that holds one has already been validated.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use clap::ValueEnum;

use crate::domain::catalog;
use crate::error::SeriesError;

/// A validated SMARD series identifier (e.g. `410` = total consumption).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeriesId(u32);

impl SeriesId {
    pub fn new(raw: u32) -> Result<Self, SeriesError> {
        if catalog::series_label(raw).is_some() {
            Ok(Self(raw))
        } else {
            Err(SeriesError::InvalidParameter(format!("Unknown series ID: {raw}")))
        }
    }

    /// Resolve a CLI token: either a short name (`pv`) or a numeric id (`4068`).
    pub fn from_name_or_id(s: &str) -> Result<Self, SeriesError> {
        let s = s.trim();
        if let Some(id) = catalog::id_for_short_name(s) {
            return Ok(Self(id));
        }
        match s.parse::<u32>() {
            Ok(raw) => Self::new(raw),
            Err(_) => Err(SeriesError::InvalidParameter(format!("Unknown series name: '{s}'"))),
        }
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn label(self) -> &'static str {
        // Construction guarantees presence in the catalog.
        catalog::series_label(self.0).unwrap_or("unknown")
    }

    pub fn short_name(self) -> Option<&'static str> {
        catalog::short_name_for(self.0)
    }

    /// Column / file name: the short name if the series has one, else `series_<id>`.
    pub fn column_name(self) -> String {
        match self.short_name() {
            Some(name) => name.to_string(),
            None => format!("series_{}", self.0),
        }
    }

    /// Market prices are not energy quantities: they are never scaled or
    /// compared against consumption.
    pub fn is_price(self) -> bool {
        catalog::is_price(self.0)
    }

    /// The default download selection.
    pub fn selected() -> Vec<SeriesId> {
        catalog::SELECTED_SERIES.iter().map(|(_, id)| SeriesId(*id)).collect()
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SeriesId {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name_or_id(s)
    }
}

/// Market area or control zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Region {
    #[value(name = "DE")]
    De,
    #[value(name = "AT")]
    At,
    #[value(name = "LU")]
    Lu,
    #[value(name = "DE-LU")]
    DeLu,
    #[value(name = "DE-AT-LU")]
    DeAtLu,
    #[value(name = "50Hertz")]
    FiftyHertz,
    #[value(name = "Amprion")]
    Amprion,
    #[value(name = "TenneT")]
    TenneT,
    #[value(name = "TransnetBW")]
    TransnetBw,
    #[value(name = "APG")]
    Apg,
    #[value(name = "Creos")]
    Creos,
}

impl Region {
    pub const ALL: [Region; 11] = [
        Region::De,
        Region::At,
        Region::Lu,
        Region::DeLu,
        Region::DeAtLu,
        Region::FiftyHertz,
        Region::Amprion,
        Region::TenneT,
        Region::TransnetBw,
        Region::Apg,
        Region::Creos,
    ];

    /// Code used in API paths.
    pub fn code(self) -> &'static str {
        match self {
            Region::De => "DE",
            Region::At => "AT",
            Region::Lu => "LU",
            Region::DeLu => "DE-LU",
            Region::DeAtLu => "DE-AT-LU",
            Region::FiftyHertz => "50Hertz",
            Region::Amprion => "Amprion",
            Region::TenneT => "TenneT",
            Region::TransnetBw => "TransnetBW",
            Region::Apg => "APG",
            Region::Creos => "Creos",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Region::De => "Deutschland",
            Region::At => "Österreich",
            Region::Lu => "Luxemburg",
            Region::DeLu => "Marktgebiet DE/LU (ab 01.10.2018)",
            Region::DeAtLu => "Marktgebiet DE/AT/LU (bis 30.09.2018)",
            Region::FiftyHertz => "Regelzone (DE): 50Hertz",
            Region::Amprion => "Regelzone (DE): Amprion",
            Region::TenneT => "Regelzone (DE): TenneT",
            Region::TransnetBw => "Regelzone (DE): TransnetBW",
            Region::Apg => "Regelzone (AT): APG",
            Region::Creos => "Regelzone (LU): Creos",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Region {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Region::ALL
            .into_iter()
            .find(|r| r.code() == s)
            .ok_or_else(|| SeriesError::InvalidParameter(format!("Unknown region ID: {s}")))
    }
}

/// Sampling granularity; also selects the remote index namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Resolution {
    #[value(name = "quarterhour")]
    QuarterHour,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Resolution {
    pub const ALL: [Resolution; 6] = [
        Resolution::QuarterHour,
        Resolution::Hour,
        Resolution::Day,
        Resolution::Week,
        Resolution::Month,
        Resolution::Year,
    ];

    /// Spelling used in API paths (`index_quarterhour.json`).
    pub fn as_api_str(self) -> &'static str {
        match self {
            Resolution::QuarterHour => "quarterhour",
            Resolution::Hour => "hour",
            Resolution::Day => "day",
            Resolution::Week => "week",
            Resolution::Month => "month",
            Resolution::Year => "year",
        }
    }

    /// Factor turning a mean over samples of this width into a per-hour value.
    ///
    /// Undefined for month and year, whose lengths vary.
    pub fn hourly_factor(self) -> Option<f64> {
        match self {
            Resolution::QuarterHour => Some(4.0),
            Resolution::Hour => Some(1.0),
            Resolution::Day => Some(1.0 / 24.0),
            Resolution::Week => Some(1.0 / 168.0),
            Resolution::Month | Resolution::Year => None,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

impl FromStr for Resolution {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Resolution::ALL
            .into_iter()
            .find(|r| r.as_api_str() == s)
            .ok_or_else(|| SeriesError::InvalidParameter(format!("Unknown resolution: {s}")))
    }
}

/// The (series, region, resolution) triple every request is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeriesKey {
    pub series: SeriesId,
    pub region: Region,
    pub resolution: Resolution,
}

impl SeriesKey {
    pub fn new(series: SeriesId, region: Region, resolution: Resolution) -> Self {
        Self {
            series,
            region,
            resolution,
        }
    }

    /// Validate raw inputs against the closed tables.
    pub fn parse(series: u32, region: &str, resolution: &str) -> Result<Self, SeriesError> {
        Ok(Self {
            series: SeriesId::new(series)?,
            region: region.parse()?,
            resolution: resolution.parse()?,
        })
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.series, self.region, self.resolution)
    }
}

/// Opaque pagination cursor from the remote index.
///
/// Only its ordering carries meaning; it is never used as a data timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PaginationToken(pub i64);

impl PaginationToken {
    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PaginationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One observation. `value == None` means "not yet published", not zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPoint {
    pub timestamp: DateTime<Utc>,
    pub value: Option<f64>,
}

impl RawPoint {
    pub fn new(timestamp: DateTime<Utc>, value: Option<f64>) -> Self {
        Self { timestamp, value }
    }
}

/// One fetched page of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesChunk {
    pub token: PaginationToken,
    pub points: Vec<RawPoint>,
}

/// Why a chunk was left out of an assembled series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkFailureKind {
    Upstream,
    Malformed,
}

/// A chunk that was skipped during assembly (a gap in the timeline).
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedChunk {
    pub token: PaginationToken,
    pub kind: ChunkFailureKind,
    pub reason: String,
}

/// A complete series: strictly increasing instants, no duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledSeries {
    key: SeriesKey,
    points: Vec<RawPoint>,
    skipped: Vec<SkippedChunk>,
}

impl AssembledSeries {
    /// Build from points that must already be strictly increasing in time.
    pub fn new(key: SeriesKey, points: Vec<RawPoint>, skipped: Vec<SkippedChunk>) -> Result<Self, SeriesError> {
        if let Some(pair) = points.windows(2).find(|w| w[0].timestamp >= w[1].timestamp) {
            return Err(SeriesError::InvalidParameter(format!(
                "Series {key} is not strictly increasing: {} followed by {}",
                pair[0].timestamp, pair[1].timestamp
            )));
        }
        Ok(Self { key, points, skipped })
    }

    pub fn empty(key: SeriesKey) -> Self {
        Self {
            key,
            points: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn key(&self) -> SeriesKey {
        self.key
    }

    pub fn points(&self) -> &[RawPoint] {
        &self.points
    }

    pub fn skipped(&self) -> &[SkippedChunk] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of instants whose value is still unpublished.
    pub fn null_count(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_none()).count()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.points.first().map(|p| p.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|p| p.timestamp)
    }
}

/// One row of a [`WideTable`]; `values[i]` belongs to `WideTable::columns()[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub timestamp: DateTime<Utc>,
    pub values: Vec<Option<f64>>,
}

/// Timestamp-indexed table with one column per series.
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    columns: Vec<SeriesId>,
    rows: Vec<WideRow>,
}

impl WideTable {
    pub(crate) fn from_parts(columns: Vec<SeriesId>, rows: Vec<WideRow>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[SeriesId] {
        &self.columns
    }

    pub fn rows(&self) -> &[WideRow] {
        &self.rows
    }

    pub fn column_index(&self, id: SeriesId) -> Option<usize> {
        self.columns.iter().position(|c| *c == id)
    }
}

/// Calendar attributes derived from one UTC instant.
///
/// Everything except `local_hour` is derived from the UTC instant itself.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarFields {
    /// Hour of day in the reference timezone (DST-aware).
    pub local_hour: u32,
    pub date: NaiveDate,
    pub day_of_month: u32,
    pub day_of_year: u32,
    pub iso_week: u32,
    pub month: u32,
    /// `YYYY-MM`
    pub year_month: String,
    pub year: i32,
    pub utc_hour: u32,
    pub weekday: &'static str,
    pub bucket_start: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub timestamp: DateTime<Utc>,
    pub values: Vec<Option<f64>>,
    pub calendar: CalendarFields,
}

/// Grouping key for descriptive aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupBy {
    Year,
    YearMonth,
    Week,
    Weekday,
    LocalHour,
    /// `dd-mm`, the calendar-year seasonality view.
    CalendarDay,
}

/// Which days of the week enter the aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DayFilter {
    #[default]
    All,
    /// Monday to Friday.
    Weekdays,
    /// Saturday and Sunday.
    Weekends,
}

impl DayFilter {
    pub fn keeps(self, day: Weekday) -> bool {
        let weekend = matches!(day, Weekday::Sat | Weekday::Sun);
        match self {
            DayFilter::All => true,
            DayFilter::Weekdays => !weekend,
            DayFilter::Weekends => weekend,
        }
    }
}

/// Settings shared by the commands that talk to the remote API.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub workers: usize,
}

/// Resolved configuration for `smard download`.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub source: SourceConfig,
    pub series: Vec<SeriesId>,
    pub region: Region,
    pub resolution: Resolution,
    pub data_dir: PathBuf,
    pub drop_missing: bool,
}

/// Resolved configuration for `smard table`.
#[derive(Debug, Clone)]
pub struct TableConfig {
    pub series: Vec<SeriesId>,
    pub region: Region,
    pub resolution: Resolution,
    pub data_dir: PathBuf,
    pub timezone: String,
    pub bucket_minutes: i64,
    pub group_by: GroupBy,
    pub days: DayFilter,
    /// Report means and extremes of energy columns as per-hour values.
    pub hourly: bool,
    pub export: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn unknown_identifiers_are_rejected() {
        assert!(matches!(SeriesId::new(9999), Err(SeriesError::InvalidParameter(_))));
        assert!(matches!("XX".parse::<Region>(), Err(SeriesError::InvalidParameter(_))));
        assert!(matches!("minute".parse::<Resolution>(), Err(SeriesError::InvalidParameter(_))));
        assert!(matches!(
            SeriesKey::parse(410, "DE", "fortnight"),
            Err(SeriesError::InvalidParameter(_))
        ));
    }

    #[test]
    fn series_id_accepts_names_and_numbers() {
        assert_eq!(SeriesId::from_name_or_id("wind_onshore").unwrap().raw(), 4067);
        assert_eq!(SeriesId::from_name_or_id(" 1223 ").unwrap().raw(), 1223);
        assert!(SeriesId::from_name_or_id("coal").is_err());
        assert_eq!(SeriesId::new(1223).unwrap().column_name(), "series_1223");
        assert_eq!(SeriesId::new(4068).unwrap().column_name(), "pv");
    }

    #[test]
    fn region_and_resolution_round_trip_through_codes() {
        for region in Region::ALL {
            assert_eq!(region.code().parse::<Region>().unwrap(), region);
        }
        for res in Resolution::ALL {
            assert_eq!(res.as_api_str().parse::<Resolution>().unwrap(), res);
        }
        let key = SeriesKey::parse(410, "50Hertz", "quarterhour").unwrap();
        assert_eq!(key.to_string(), "410/50Hertz/quarterhour");
    }

    #[test]
    fn hourly_factor_and_price_flag() {
        assert_eq!(Resolution::QuarterHour.hourly_factor(), Some(4.0));
        assert_eq!(Resolution::Hour.hourly_factor(), Some(1.0));
        assert_eq!(Resolution::Month.hourly_factor(), None);
        assert!(SeriesId::new(4169).unwrap().is_price());
        assert!(!SeriesId::new(410).unwrap().is_price());
    }

    #[test]
    fn day_filter_splits_the_week() {
        assert!(DayFilter::All.keeps(Weekday::Sun));
        assert!(DayFilter::Weekdays.keeps(Weekday::Fri));
        assert!(!DayFilter::Weekdays.keeps(Weekday::Sat));
        assert!(DayFilter::Weekends.keeps(Weekday::Sun));
        assert!(!DayFilter::Weekends.keeps(Weekday::Mon));
    }

    #[test]
    fn assembled_series_rejects_non_increasing_points() {
        let key = SeriesKey::parse(410, "DE", "hour").unwrap();
        let ok = AssembledSeries::new(
            key,
            vec![RawPoint::new(ts(0), Some(1.0)), RawPoint::new(ts(60), None)],
            Vec::new(),
        )
        .unwrap();
        assert_eq!(ok.len(), 2);
        assert_eq!(ok.null_count(), 1);

        let dup = AssembledSeries::new(
            key,
            vec![RawPoint::new(ts(60), Some(1.0)), RawPoint::new(ts(60), Some(2.0))],
            Vec::new(),
        );
        assert!(dup.is_err());
    }
}
