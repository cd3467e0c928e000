//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - downloads and persists series
//! - aligns persisted series and prints aggregates
//! - writes optional exports

use std::time::Duration;

use chrono::DateTime;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Command, DownloadArgs, IndicesArgs, SourceArgs, TableArgs};
use crate::data::{HttpTransport, SmardClient};
use crate::domain::catalog::SERIES_CATALOG;
use crate::domain::{DownloadConfig, Region, Resolution, SeriesKey, SourceConfig, TableConfig};
use crate::error::{AppError, EXIT_DATA};
use crate::series::CancelToken;

pub mod pipeline;

/// Entry point for the `smard` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Catalog => handle_catalog(),
        Command::Indices(args) => handle_indices(args),
        Command::Download(args) => handle_download(args),
        Command::Table(args) => handle_table(args),
    }
}

fn init_tracing() {
    // Logs go to stderr so stdout stays clean for reports.
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn,smard_series=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn handle_catalog() -> Result<(), AppError> {
    println!("=== Series ===");
    for (id, label) in SERIES_CATALOG {
        let short = crate::domain::catalog::short_name_for(*id).unwrap_or("");
        println!("{id:>6}  {short:<24} {label}");
    }

    println!("\n=== Regions ===");
    for region in Region::ALL {
        println!("{:<12} {}", region.code(), region.label());
    }

    println!("\n=== Resolutions ===");
    let names: Vec<&str> = Resolution::ALL.iter().map(|r| r.as_api_str()).collect();
    println!("{}", names.join(", "));
    Ok(())
}

fn handle_indices(args: IndicesArgs) -> Result<(), AppError> {
    let client = client_from_config(&source_config_from_args(&args.source))?;
    let keys: Vec<SeriesKey> = args
        .selection
        .series_or_default()
        .into_iter()
        .map(|series| SeriesKey::new(series, args.selection.region, args.selection.resolution))
        .collect();

    let outcomes = pipeline::resolve_all(&keys, &client);

    let mut failed = 0usize;
    for outcome in &outcomes {
        let label = outcome.key.series.label();
        match &outcome.result {
            Ok(tokens) => {
                println!("{} ({label}): {} token(s)", outcome.key, tokens.len());
                for token in tokens {
                    // Tokens look like epoch millis; the rendering is a hint only.
                    let hint = DateTime::from_timestamp_millis(token.value())
                        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
                        .unwrap_or_default();
                    println!("  {token}  {hint}");
                }
            }
            Err(err) => {
                failed += 1;
                println!("{} ({label}): FAILED: {err}", outcome.key);
            }
        }
    }

    if failed > 0 {
        return Err(AppError::new(
            EXIT_DATA,
            format!("{failed} of {} indices could not be resolved.", outcomes.len()),
        ));
    }
    Ok(())
}

fn handle_download(args: DownloadArgs) -> Result<(), AppError> {
    let config = download_config_from_args(&args);
    let client = client_from_config(&config.source)?;

    let outcomes = pipeline::download_all(&config, &client, &CancelToken::new())?;

    let mut failed = 0usize;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(written) => {
                println!("{}", crate::report::format_series_line(&written.series));
                println!("    -> {} ({} rows)", outcome.path.display(), written.rows_written);
            }
            Err(err) => {
                failed += 1;
                println!("{}: FAILED: {err}", outcome.key);
            }
        }
    }

    if failed > 0 {
        return Err(AppError::new(
            EXIT_DATA,
            format!("{failed} of {} series failed to download.", outcomes.len()),
        ));
    }
    Ok(())
}

fn handle_table(args: TableArgs) -> Result<(), AppError> {
    let config = table_config_from_args(&args);
    let run = pipeline::build_table(&config)?;

    print!("{}", crate::report::format_summary(&run.summary));
    if let Some(shares) = &run.shares {
        println!("{}", crate::report::format_shares(shares));
    }

    if let Some(path) = &config.export {
        crate::io::export::write_enriched_csv(path, run.table.columns(), &run.rows)?;
        println!("Wrote {} rows to {}", run.rows.len(), path.display());
    }
    Ok(())
}

fn client_from_config(config: &SourceConfig) -> Result<SmardClient<HttpTransport>, AppError> {
    let transport = HttpTransport::new(config.timeout)?;
    Ok(SmardClient::new(transport, config.base_url.clone()))
}

pub fn source_config_from_args(args: &SourceArgs) -> SourceConfig {
    SourceConfig {
        base_url: args.base_url.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
        workers: args.workers.max(1),
    }
}

pub fn download_config_from_args(args: &DownloadArgs) -> DownloadConfig {
    DownloadConfig {
        source: source_config_from_args(&args.source),
        series: args.selection.series_or_default(),
        region: args.selection.region,
        resolution: args.selection.resolution,
        data_dir: args.data_dir.clone(),
        drop_missing: args.drop_missing,
    }
}

pub fn table_config_from_args(args: &TableArgs) -> TableConfig {
    TableConfig {
        series: args.selection.series_or_default(),
        region: args.selection.region,
        resolution: args.selection.resolution,
        data_dir: args.data_dir.clone(),
        timezone: args.timezone.clone(),
        bucket_minutes: args.bucket_minutes,
        group_by: args.group_by,
        days: args.days,
        hourly: args.hourly,
        export: args.export.clone(),
    }
}
