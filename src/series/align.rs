//! Outer-join assembled series into one timestamp-indexed table.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::{AssembledSeries, WideRow, WideTable};
use crate::error::SeriesError;

/// Join `series` on timestamp.
///
/// Rows are the union of all instants, ascending. Columns follow input order.
/// A series without a value at an instant contributes `None`; nothing is
/// interpolated or filled.
pub fn align(series: &[AssembledSeries]) -> Result<WideTable, SeriesError> {
    if series.is_empty() {
        return Err(SeriesError::EmptyInput);
    }

    let mut columns = Vec::with_capacity(series.len());
    for s in series {
        let id = s.key().series;
        if columns.contains(&id) {
            return Err(SeriesError::InvalidParameter(format!(
                "Series {id} supplied more than once for alignment"
            )));
        }
        columns.push(id);
    }

    let width = columns.len();
    let mut rows: BTreeMap<DateTime<Utc>, Vec<Option<f64>>> = BTreeMap::new();
    for (col, s) in series.iter().enumerate() {
        for point in s.points() {
            rows.entry(point.timestamp).or_insert_with(|| vec![None; width])[col] = point.value;
        }
    }

    let rows = rows
        .into_iter()
        .map(|(timestamp, values)| WideRow { timestamp, values })
        .collect();

    Ok(WideTable::from_parts(columns, rows))
}
