//! Formatted terminal output.
//!
//! Kept in one place so output changes stay localized.

use crate::domain::{AssembledSeries, GroupBy};
use crate::report::{ShareTable, Summary};

/// One-line description of an assembled series.
pub fn format_series_line(series: &AssembledSeries) -> String {
    let key = series.key();
    let span = match (series.first_timestamp(), series.last_timestamp()) {
        (Some(first), Some(last)) => format!(
            "{} .. {}",
            first.format("%Y-%m-%d %H:%M"),
            last.format("%Y-%m-%d %H:%M")
        ),
        _ => "no data".to_string(),
    };

    let mut out = format!(
        "{:<24} {:>5} {:<12} {:>9} points ({} null)  {}",
        key.series.column_name(),
        key.series.raw(),
        key.resolution.to_string(),
        series.len(),
        series.null_count(),
        span
    );
    if !series.skipped().is_empty() {
        let tokens: Vec<String> = series.skipped().iter().map(|s| s.token.to_string()).collect();
        out.push_str(&format!("  [{} chunk(s) skipped: {}]", tokens.len(), tokens.join(", ")));
    }
    out
}

/// One block per column: mean, min and max per group, with non-null counts.
pub fn format_summary(summary: &Summary) -> String {
    let mut out = String::new();
    let label_width = summary
        .groups
        .iter()
        .map(|g| g.label.len())
        .max()
        .unwrap_or(0)
        .max(6);
    let cell = |v: Option<f64>| v.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string());

    for (idx, column) in summary.columns.iter().enumerate() {
        let hourly = match summary.hourly_factor {
            Some(_) if column.is_energy() => " (per hour)",
            _ => "",
        };
        out.push_str(&format!(
            "=== {column} by {}{hourly} ===\n",
            group_by_label(summary.group_by)
        ));
        out.push_str(&format!(
            "{:<label_width$}  {:>14}  {:>14}  {:>14}  {:>8}\n",
            "group", "mean", "min", "max", "n"
        ));
        for group in &summary.groups {
            let stats = &group.stats[idx];
            out.push_str(&format!(
                "{:<label_width$}  {:>14}  {:>14}  {:>14}  {:>8}\n",
                group.label,
                cell(stats.mean()),
                cell(stats.min()),
                cell(stats.max()),
                stats.count()
            ));
        }
        out.push('\n');
    }

    out
}

/// Percent of consumption per group, one column per energy series.
pub fn format_shares(shares: &ShareTable) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "=== Share of {} by {} ===\n",
        shares.denominator,
        group_by_label(shares.group_by)
    ));

    let label_width = shares
        .groups
        .iter()
        .map(|g| g.label.len())
        .max()
        .unwrap_or(0)
        .max(6);
    let names: Vec<String> = shares.columns.iter().map(|c| format!("pct_{c}")).collect();
    let col_width = names.iter().map(|n| n.len()).max().unwrap_or(0).max(9);

    out.push_str(&format!("{:<label_width$}", "group"));
    for name in &names {
        out.push_str(&format!("  {name:>col_width$}"));
    }
    out.push('\n');

    for group in &shares.groups {
        out.push_str(&format!("{:<label_width$}", group.label));
        for pct in &group.percent {
            let value = pct.map(|p| format!("{p:.2}%")).unwrap_or_else(|| "-".to_string());
            out.push_str(&format!("  {value:>col_width$}"));
        }
        out.push('\n');
    }
    out
}
