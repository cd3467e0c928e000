//! Descriptive aggregates over enriched rows: grouped mean/min/max and
//! consumption shares.
//!
//! Nulls are skipped, never counted as zero, so a gappy column simply has a
//! smaller `count` in the affected groups.

use std::collections::BTreeMap;

use chrono::Datelike;

use crate::domain::{EnrichedRow, GroupBy, SeriesId};

pub mod derived;
pub mod format;

pub use derived::*;
pub use format::*;

/// Running aggregates for one column within one group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Default for ColumnStats {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl ColumnStats {
    pub fn from_values(values: &[f64]) -> Self {
        let mut stats = Self::default();
        for &v in values {
            stats.push(v);
        }
        stats
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }

    pub fn min(&self) -> Option<f64> {
        (self.count > 0).then_some(self.min)
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub label: String,
    /// One entry per column, same order as `Summary::columns`.
    pub stats: Vec<ColumnStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub group_by: GroupBy,
    pub columns: Vec<ReportColumn>,
    /// Factor applied to energy columns before aggregation, if any.
    pub hourly_factor: Option<f64>,
    pub groups: Vec<GroupSummary>,
}

/// Group the rows of `table` by `group_by`, in natural order of the key
/// (chronological, Monday-first, hour-of-day, or month-then-day).
///
/// With `hourly_factor`, energy columns are multiplied by it before
/// aggregating, so means and extremes read as per-hour values. Prices and
/// percentages are left as they are.
pub fn summarize(table: &ReportTable, group_by: GroupBy, hourly_factor: Option<f64>) -> Summary {
    let scale: Vec<f64> = table
        .columns
        .iter()
        .map(|c| match hourly_factor {
            Some(f) if c.is_energy() => f,
            _ => 1.0,
        })
        .collect();

    let mut groups: BTreeMap<(i64, i64), GroupSummary> = BTreeMap::new();

    for row in &table.rows {
        let (order, label) = group_key(row, group_by);
        let group = groups.entry(order).or_insert_with(|| GroupSummary {
            label,
            stats: vec![ColumnStats::default(); table.columns.len()],
        });
        for ((stats, value), factor) in group.stats.iter_mut().zip(&row.values).zip(&scale) {
            if let Some(v) = value {
                stats.push(v * factor);
            }
        }
    }

    Summary {
        group_by,
        columns: table.columns.clone(),
        hourly_factor,
        groups: groups.into_values().collect(),
    }
}

fn group_key(row: &EnrichedRow, group_by: GroupBy) -> ((i64, i64), String) {
    let c = &row.calendar;
    match group_by {
        GroupBy::Year => ((c.year as i64, 0), c.year.to_string()),
        GroupBy::YearMonth => ((c.year as i64, c.month as i64), c.year_month.clone()),
        GroupBy::Week => ((c.iso_week as i64, 0), format!("W{:02}", c.iso_week)),
        GroupBy::Weekday => (
            (c.date.weekday().num_days_from_monday() as i64, 0),
            c.weekday.to_string(),
        ),
        GroupBy::LocalHour => ((c.local_hour as i64, 0), format!("{:02}", c.local_hour)),
        GroupBy::CalendarDay => (
            (c.month as i64, c.day_of_month as i64),
            format!("{:02}-{:02}", c.day_of_month, c.month),
        ),
    }
}

/// Per-group percentage of each energy column's sum in the consumption sum.
#[derive(Debug, Clone, PartialEq)]
pub struct ShareTable {
    pub group_by: GroupBy,
    pub denominator: ReportColumn,
    pub columns: Vec<ReportColumn>,
    pub groups: Vec<ShareGroup>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShareGroup {
    pub label: String,
    /// Percent per entry of `ShareTable::columns`; `None` without data or consumption.
    pub percent: Vec<Option<f64>>,
}

/// `sum(column) / sum(electricity_consumption) * 100` per group, for every
/// other energy column (`wind_pv` gives the renewables share).
///
/// `None` when consumption is not among the summary columns. The hourly
/// factor cancels out because both sums carry it.
pub fn consumption_shares(summary: &Summary) -> Option<ShareTable> {
    let denominator = ReportColumn::Series(SeriesId::new(CONSUMPTION).ok()?);
    let den_idx = summary.columns.iter().position(|c| *c == denominator)?;

    let numerators: Vec<(usize, ReportColumn)> = summary
        .columns
        .iter()
        .enumerate()
        .filter(|(i, c)| *i != den_idx && c.is_energy())
        .map(|(i, c)| (i, *c))
        .collect();

    let groups = summary
        .groups
        .iter()
        .map(|group| {
            let den = group.stats[den_idx];
            let percent = numerators
                .iter()
                .map(|(i, _)| {
                    let num = group.stats[*i];
                    if num.count() == 0 || den.count() == 0 || den.sum() == 0.0 {
                        None
                    } else {
                        Some(num.sum() / den.sum() * 100.0)
                    }
                })
                .collect();
            ShareGroup {
                label: group.label.clone(),
                percent,
            }
        })
        .collect();

    Some(ShareTable {
        group_by: summary.group_by,
        denominator,
        columns: numerators.into_iter().map(|(_, c)| c).collect(),
        groups,
    })
}
