//! Shared pipeline logic behind the `download` and `table` commands.
//!
//! indices:  index per series
//! download: index -> chunks -> assembled series -> CSV per series
//! table:    CSV per series -> aligned table -> calendar fields -> derived
//!           columns -> aggregates
//!
//! The command handlers in `app` only deal with presentation.

use std::path::PathBuf;

use crate::data::{SmardClient, Transport};
use crate::domain::{AssembledSeries, DownloadConfig, EnrichedRow, PaginationToken, SeriesKey, TableConfig, WideTable};
use crate::error::{AppError, EXIT_INPUT, SeriesError};
use crate::io::{read_series_csv, series_file_path, write_series_csv};
use crate::report::{ReportTable, ShareTable, Summary, consumption_shares, summarize, with_derived_columns};
use crate::series::{CalendarEnricher, CancelToken, SeriesAssembler, align};

/// Resolved tokens (or the failure) for one series during `indices`.
#[derive(Debug)]
pub struct IndexOutcome {
    pub key: SeriesKey,
    pub result: Result<Vec<PaginationToken>, SeriesError>,
}

/// Resolve the index of every key. A failing series does not stop the rest.
pub fn resolve_all<T: Transport>(keys: &[SeriesKey], client: &SmardClient<T>) -> Vec<IndexOutcome> {
    keys.iter()
        .map(|&key| {
            let result = client.resolve_index(&key);
            if let Err(err) = &result {
                tracing::error!(%key, error = %err, "index failed");
            }
            IndexOutcome { key, result }
        })
        .collect()
}

/// What happened to one series during `download`.
#[derive(Debug)]
pub struct DownloadOutcome {
    pub key: SeriesKey,
    pub path: PathBuf,
    pub result: Result<WrittenSeries, AppError>,
}

#[derive(Debug)]
pub struct WrittenSeries {
    pub series: AssembledSeries,
    pub rows_written: usize,
}

/// Assemble and persist every configured series.
///
/// A series that fails is recorded and the rest still run; cancellation aborts
/// the whole batch.
pub fn download_all<T: Transport>(
    config: &DownloadConfig,
    client: &SmardClient<T>,
    cancel: &CancelToken,
) -> Result<Vec<DownloadOutcome>, AppError> {
    let assembler = SeriesAssembler::new(client)
        .with_workers(config.source.workers)
        .with_cancel(cancel.clone());

    let mut outcomes = Vec::with_capacity(config.series.len());
    for &series in &config.series {
        let key = SeriesKey::new(series, config.region, config.resolution);
        let path = series_file_path(&config.data_dir, series, config.resolution);
        tracing::info!(%key, label = series.label(), "download started");

        let result = match assembler.assemble(key) {
            Ok(assembled) => write_series_csv(&path, &assembled, config.drop_missing).map(|rows_written| {
                tracing::info!(%key, path = %path.display(), rows_written, "series written");
                WrittenSeries {
                    series: assembled,
                    rows_written,
                }
            }),
            Err(err @ SeriesError::Cancelled { .. }) => return Err(err.into()),
            Err(err) => {
                tracing::error!(%key, error = %err, "series failed");
                Err(err.into())
            }
        };

        outcomes.push(DownloadOutcome { key, path, result });
    }
    Ok(outcomes)
}

/// All computed outputs of a single `table` run.
#[derive(Debug, Clone)]
pub struct TableRun {
    pub table: WideTable,
    /// Every aligned row with calendar fields, before the day filter.
    pub rows: Vec<EnrichedRow>,
    /// Day-filtered rows with derived columns; the input of `summary`.
    pub report: ReportTable,
    pub summary: Summary,
    /// Present when consumption is among the loaded series.
    pub shares: Option<ShareTable>,
}

pub fn build_table(config: &TableConfig) -> Result<TableRun, AppError> {
    // Validate the zone before touching any file.
    let enricher = CalendarEnricher::new(&config.timezone, config.bucket_minutes)?;
    let hourly_factor = if config.hourly {
        let factor = config.resolution.hourly_factor().ok_or_else(|| {
            AppError::new(
                EXIT_INPUT,
                format!("Hourly scaling is not defined for {} resolution.", config.resolution),
            )
        })?;
        Some(factor)
    } else {
        None
    };

    let series = config
        .series
        .iter()
        .map(|&id| {
            let key = SeriesKey::new(id, config.region, config.resolution);
            read_series_csv(&series_file_path(&config.data_dir, id, config.resolution), key)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let table = align(&series)?;
    let rows = enricher.enrich(&table);

    let mut report = with_derived_columns(table.columns(), &rows);
    report.retain_days(config.days);
    let summary = summarize(&report, config.group_by, hourly_factor);
    let shares = consumption_shares(&summary);

    Ok(TableRun {
        table,
        rows,
        report,
        summary,
        shares,
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::data::testing::FakeTransport;
    use crate::domain::{DayFilter, GroupBy, Region, Resolution, SeriesId, SourceConfig};
    use crate::error::{EXIT_CANCELLED, EXIT_DATA, EXIT_INPUT};

    fn download_config(dir: &std::path::Path, series: Vec<SeriesId>) -> DownloadConfig {
        DownloadConfig {
            source: SourceConfig {
                base_url: "http://x".to_string(),
                timeout: Duration::from_secs(5),
                workers: 2,
            },
            series,
            region: Region::De,
            resolution: Resolution::Hour,
            data_dir: dir.to_path_buf(),
            drop_missing: false,
        }
    }

    fn table_config(dir: &std::path::Path, series: Vec<SeriesId>) -> TableConfig {
        TableConfig {
            series,
            region: Region::De,
            resolution: Resolution::Hour,
            data_dir: dir.to_path_buf(),
            timezone: "Europe/Berlin".to_string(),
            bucket_minutes: 15,
            group_by: GroupBy::Year,
            days: DayFilter::All,
            hourly: false,
            export: None,
        }
    }

    /// 2023-01-01T00:00Z and +1h, in millis.
    const T0: i64 = 1_672_531_200_000;
    const T1: i64 = T0 + 3_600_000;

    fn serve(fake: &FakeTransport, client: &SmardClient<&FakeTransport>, id: u32, body: &str) {
        let key = SeriesKey::new(SeriesId::new(id).unwrap(), Region::De, Resolution::Hour);
        fake.respond_ok(&client.index_url(&key), r#"{"timestamps":[1]}"#);
        fake.respond_ok(&client.chunk_url(&key, PaginationToken(1)), body);
    }

    #[test]
    fn download_then_table_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransport::default();
        let client = SmardClient::new(&fake, "http://x");
        serve(&fake, &client, 4067, &format!(r#"{{"series":[[{T0},10.0],[{T1},30.0]]}}"#));
        serve(&fake, &client, 4068, &format!(r#"{{"series":[[{T1},null]]}}"#));

        let wind = SeriesId::new(4067).unwrap();
        let pv = SeriesId::new(4068).unwrap();
        let outcomes = download_all(
            &download_config(dir.path(), vec![wind, pv]),
            &client,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        assert!(dir.path().join("wind_onshore_hour.csv").exists());
        assert!(dir.path().join("pv_hour.csv").exists());

        let run = build_table(&table_config(dir.path(), vec![wind, pv])).unwrap();
        assert_eq!(run.table.rows().len(), 2);
        assert_eq!(run.rows[0].values, vec![Some(10.0), None]);
        assert_eq!(run.rows[1].values, vec![Some(30.0), None]);
        assert_eq!(run.summary.groups.len(), 1);
        assert_eq!(run.summary.groups[0].stats[0].mean(), Some(20.0));
        assert_eq!(run.summary.groups[0].stats[1].count(), 0);
        assert!(run.shares.is_none());
    }

    #[test]
    fn table_scales_hourly_filters_days_and_shares_consumption() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransport::default();
        let client = SmardClient::new(&fake, "http://x");
        // T0 is a Sunday; T2 is the Monday after.
        const T2: i64 = T0 + 86_400_000;
        serve(&fake, &client, 410, &format!(r#"{{"series":[[{T0},100.0],[{T2},200.0]]}}"#));
        serve(&fake, &client, 4359, &format!(r#"{{"series":[[{T0},40.0],[{T2},50.0]]}}"#));

        let ids = vec![SeriesId::new(410).unwrap(), SeriesId::new(4359).unwrap()];
        download_all(&download_config(dir.path(), ids.clone()), &client, &CancelToken::new()).unwrap();

        let mut config = table_config(dir.path(), ids);
        config.hourly = true;
        config.days = DayFilter::Weekdays;
        let run = build_table(&config).unwrap();

        assert_eq!(run.rows.len(), 2);
        assert_eq!(run.report.rows.len(), 1);
        let names: Vec<String> = run.summary.columns.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["electricity_consumption", "residual_load", "pct_residual_load"]);

        // Hour resolution: factor 1.
        let stats = &run.summary.groups[0].stats;
        assert_eq!(stats[0].mean(), Some(200.0));
        assert_eq!(stats[2].max(), Some(25.0));

        let shares = run.shares.unwrap();
        assert_eq!(shares.groups[0].percent, vec![Some(25.0)]);

        config.resolution = Resolution::Month;
        let err = build_table(&config).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
        assert!(err.to_string().contains("month"));
    }

    #[test]
    fn indices_continue_after_a_failed_series() {
        let fake = FakeTransport::default();
        let client = SmardClient::new(&fake, "http://x");
        let ok = SeriesKey::new(SeriesId::new(4068).unwrap(), Region::De, Resolution::Hour);
        let missing = SeriesKey::new(SeriesId::new(4067).unwrap(), Region::De, Resolution::Hour);
        fake.respond_ok(&client.index_url(&ok), r#"{"timestamps":[200,100]}"#);

        let outcomes = resolve_all(&[missing, ok], &client);
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            outcomes[0].result,
            Err(SeriesError::UpstreamUnavailable { status: None, .. })
        ));
        assert_eq!(
            outcomes[1].result.as_ref().unwrap(),
            &vec![PaginationToken(200), PaginationToken(100)]
        );
    }

    #[test]
    fn failed_series_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransport::default();
        let client = SmardClient::new(&fake, "http://x");
        // Only pv is served; wind's index is unreachable.
        serve(&fake, &client, 4068, &format!(r#"{{"series":[[{T0},1.5]]}}"#));

        let config = download_config(
            dir.path(),
            vec![SeriesId::new(4067).unwrap(), SeriesId::new(4068).unwrap()],
        );
        let outcomes = download_all(&config, &client, &CancelToken::new()).unwrap();

        let wind_err = outcomes[0].result.as_ref().unwrap_err();
        assert_eq!(wind_err.exit_code(), EXIT_DATA);
        assert!(wind_err.to_string().contains("4067/DE/hour"));
        assert_eq!(outcomes[1].result.as_ref().unwrap().rows_written, 1);
        assert!(!dir.path().join("wind_onshore_hour.csv").exists());
    }

    #[test]
    fn cancellation_aborts_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let fake = FakeTransport::default();
        let client = SmardClient::new(&fake, "http://x");
        serve(&fake, &client, 4068, &format!(r#"{{"series":[[{T0},1.5]]}}"#));

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = download_all(
            &download_config(dir.path(), vec![SeriesId::new(4068).unwrap()]),
            &client,
            &cancel,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), EXIT_CANCELLED);
    }

    #[test]
    fn table_rejects_bad_timezone_and_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = table_config(dir.path(), vec![SeriesId::new(410).unwrap()]);

        config.timezone = "Nowhere/Special".to_string();
        let err = build_table(&config).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
        assert!(err.to_string().contains("Nowhere/Special"));

        config.timezone = "Europe/Berlin".to_string();
        let err = build_table(&config).unwrap_err();
        assert!(err.to_string().contains("electricity_consumption_hour.csv"));

        config.series.clear();
        let err = build_table(&config).unwrap_err();
        assert!(err.to_string().contains("empty set of series"));
    }
}
