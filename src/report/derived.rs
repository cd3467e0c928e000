//! Columns computed from other series in the same row.

use std::fmt;

use chrono::Datelike;

use crate::domain::{DayFilter, EnrichedRow, SeriesId};

const WIND_OFFSHORE: u32 = 1225;
const WIND_ONSHORE: u32 = 4067;
const PV: u32 = 4068;
const RESIDUAL_LOAD: u32 = 4359;
/// Total consumption; the denominator of every consumption share.
pub const CONSUMPTION: u32 = 410;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedColumn {
    /// `wind_offshore + wind_onshore + pv`
    WindPv,
    /// `residual_load / electricity_consumption * 100`
    PctResidualLoad,
}

impl DerivedColumn {
    pub const ALL: [DerivedColumn; 2] = [DerivedColumn::WindPv, DerivedColumn::PctResidualLoad];

    pub fn name(self) -> &'static str {
        match self {
            DerivedColumn::WindPv => "wind_pv",
            DerivedColumn::PctResidualLoad => "pct_residual_load",
        }
    }

    fn inputs(self) -> &'static [u32] {
        match self {
            DerivedColumn::WindPv => &[WIND_OFFSHORE, WIND_ONSHORE, PV],
            DerivedColumn::PctResidualLoad => &[RESIDUAL_LOAD, CONSUMPTION],
        }
    }

    /// A missing input makes the result missing; so does zero consumption.
    fn compute(self, inputs: &[Option<f64>]) -> Option<f64> {
        match self {
            DerivedColumn::WindPv => inputs.iter().copied().sum(),
            DerivedColumn::PctResidualLoad => match inputs {
                [Some(residual), Some(consumption)] if *consumption != 0.0 => Some(residual / consumption * 100.0),
                _ => None,
            },
        }
    }
}

/// A column of a [`ReportTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportColumn {
    Series(SeriesId),
    Derived(DerivedColumn),
}

impl ReportColumn {
    pub fn name(&self) -> String {
        match self {
            ReportColumn::Series(id) => id.column_name(),
            ReportColumn::Derived(d) => d.name().to_string(),
        }
    }

    /// Energy columns get hourly scaling and can be set against consumption.
    pub fn is_energy(&self) -> bool {
        match self {
            ReportColumn::Series(id) => !id.is_price(),
            ReportColumn::Derived(DerivedColumn::WindPv) => true,
            ReportColumn::Derived(DerivedColumn::PctResidualLoad) => false,
        }
    }
}

impl fmt::Display for ReportColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Enriched rows plus derived values; `rows[i].values[j]` belongs to `columns[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub columns: Vec<ReportColumn>,
    pub rows: Vec<EnrichedRow>,
}

impl ReportTable {
    /// Keep only rows whose (UTC) weekday passes `filter`.
    pub fn retain_days(&mut self, filter: DayFilter) {
        self.rows.retain(|row| filter.keeps(row.calendar.date.weekday()));
    }

    pub fn column_index(&self, column: ReportColumn) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }
}

/// Append every derived column whose inputs are all present in `columns`.
pub fn with_derived_columns(columns: &[SeriesId], rows: &[EnrichedRow]) -> ReportTable {
    let mut report_columns: Vec<ReportColumn> = columns.iter().map(|&id| ReportColumn::Series(id)).collect();

    let mut derived = Vec::new();
    for column in DerivedColumn::ALL {
        let positions: Option<Vec<usize>> = column
            .inputs()
            .iter()
            .map(|raw| columns.iter().position(|c| c.raw() == *raw))
            .collect();
        if let Some(positions) = positions {
            derived.push((column, positions));
            report_columns.push(ReportColumn::Derived(column));
        }
    }

    let rows = rows
        .iter()
        .map(|row| {
            let mut row = row.clone();
            for (column, positions) in &derived {
                let inputs: Vec<Option<f64>> = positions
                    .iter()
                    .map(|&i| row.values.get(i).copied().flatten())
                    .collect();
                row.values.push(column.compute(&inputs));
            }
            row
        })
        .collect();

    ReportTable {
        columns: report_columns,
        rows,
    }
}
