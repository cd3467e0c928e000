//! Command-line parsing for the SMARD series downloader.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! retrieval and aggregation code. Options that describe the environment (base
//! URL, data directory, timezone, ...) also read `SMARD_*` variables, which
//! `app::run` loads from `.env` first.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::DEFAULT_BASE_URL;
use crate::domain::{DayFilter, GroupBy, Region, Resolution, SeriesId};
use crate::series::calendar::{DEFAULT_BUCKET_MINUTES, DEFAULT_TIMEZONE};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "smard", version, about = "Download and summarize SMARD electricity-market series")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List known series identifiers, regions and resolutions.
    Catalog,
    /// Print the pagination tokens available for each selected series.
    Indices(IndicesArgs),
    /// Fetch every chunk of each selected series and write one CSV per series.
    Download(DownloadArgs),
    /// Align persisted series, add calendar fields and print grouped aggregates.
    Table(TableArgs),
}

/// Where and how to reach the remote API.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// API base URL.
    #[arg(long, env = "SMARD_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "SMARD_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Chunks fetched concurrently per series (1 = sequential).
    #[arg(long, env = "SMARD_WORKERS", default_value_t = 1)]
    pub workers: usize,
}

/// Which series to process.
#[derive(Debug, Args, Clone)]
pub struct SelectionArgs {
    /// Series short name (e.g. `pv`) or numeric id (e.g. `4068`). Repeatable.
    /// Defaults to the standard selection.
    #[arg(short = 's', long = "series", value_parser = parse_series_id)]
    pub series: Vec<SeriesId>,

    /// Market area / control zone.
    #[arg(short = 'r', long, value_enum, env = "SMARD_REGION", default_value_t = Region::De)]
    pub region: Region,

    /// Sampling resolution.
    #[arg(long, value_enum, env = "SMARD_RESOLUTION", default_value_t = Resolution::QuarterHour)]
    pub resolution: Resolution,
}

impl SelectionArgs {
    pub fn series_or_default(&self) -> Vec<SeriesId> {
        if self.series.is_empty() {
            SeriesId::selected()
        } else {
            self.series.clone()
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct IndicesArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,
}

#[derive(Debug, Args, Clone)]
pub struct DownloadArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Directory the per-series CSV files are written to.
    #[arg(long, env = "SMARD_DATA_DIR", default_value = "data/raw_data")]
    pub data_dir: PathBuf,

    /// Leave out instants whose value is not published yet.
    #[arg(long)]
    pub drop_missing: bool,
}

#[derive(Debug, Args, Clone)]
pub struct TableArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Directory the per-series CSV files are read from.
    #[arg(long, env = "SMARD_DATA_DIR", default_value = "data/raw_data")]
    pub data_dir: PathBuf,

    /// IANA timezone for the local-hour field.
    #[arg(long, env = "SMARD_TIMEZONE", default_value = DEFAULT_TIMEZONE)]
    pub timezone: String,

    /// Width of the `bucket_start` floor, in minutes.
    #[arg(long, default_value_t = DEFAULT_BUCKET_MINUTES)]
    pub bucket_minutes: i64,

    /// Grouping for the printed aggregates.
    #[arg(long, value_enum, default_value_t = GroupBy::Year)]
    pub group_by: GroupBy,

    /// Restrict the aggregates to weekdays or weekends.
    #[arg(long, value_enum, default_value_t = DayFilter::All)]
    pub days: DayFilter,

    /// Show energy means and extremes as per-hour values (x4 for quarter hours).
    #[arg(long)]
    pub hourly: bool,

    /// Write the aligned + enriched table to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

fn parse_series_id(s: &str) -> Result<SeriesId, String> {
    SeriesId::from_name_or_id(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_defaults() {
        let cli = Cli::try_parse_from(["smard", "download"]).unwrap();
        let Command::Download(args) = cli.command else {
            panic!("expected download");
        };
        assert_eq!(args.selection.region, Region::De);
        assert_eq!(args.selection.resolution, Resolution::QuarterHour);
        assert_eq!(args.selection.series_or_default().len(), 7);
        assert!(!args.drop_missing);
    }

    #[test]
    fn series_accept_names_and_ids() {
        let cli = Cli::try_parse_from([
            "smard", "download", "-s", "pv", "--series", "1223", "-r", "50Hertz", "--resolution", "hour",
        ])
        .unwrap();
        let Command::Download(args) = cli.command else {
            panic!("expected download");
        };
        let ids: Vec<u32> = args.selection.series.iter().map(|s| s.raw()).collect();
        assert_eq!(ids, vec![4068, 1223]);
        assert_eq!(args.selection.region, Region::FiftyHertz);
        assert_eq!(args.selection.resolution, Resolution::Hour);
    }

    #[test]
    fn unknown_series_or_region_is_a_parse_error() {
        assert!(Cli::try_parse_from(["smard", "download", "-s", "9999"]).is_err());
        assert!(Cli::try_parse_from(["smard", "download", "-r", "FR"]).is_err());
    }

    #[test]
    fn table_options() {
        let cli = Cli::try_parse_from([
            "smard",
            "table",
            "--group-by",
            "calendar-day",
            "--timezone",
            "UTC",
            "--export",
            "out.csv",
            "--days",
            "weekends",
            "--hourly",
        ])
        .unwrap();
        let Command::Table(args) = cli.command else {
            panic!("expected table");
        };
        assert_eq!(args.group_by, GroupBy::CalendarDay);
        assert_eq!(args.timezone, "UTC");
        assert_eq!(args.bucket_minutes, 15);
        assert_eq!(args.days, DayFilter::Weekends);
        assert!(args.hourly);
        assert_eq!(args.export, Some(PathBuf::from("out.csv")));
    }
}
