// src/normalize/resolve.rs

use crate::config::{SeriesSpec, ValueSpec};
use crate::error::NormalizeError;
use crate::table::utils::parse_number;
use crate::table::RawTable;
use tracing::{debug, warn};

/// The column(s) a row's value is read from.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedValue {
    Column { name: String, index: usize },
    /// Chosen by the last-numeric-column escape hatch, not by name.
    LastNumeric { name: String, index: usize },
    Mean { columns: Vec<(String, usize)> },
}

impl ResolvedValue {
    /// Value of `row`, `None` when missing or non-numeric.
    pub fn value(&self, table: &RawTable, row: usize) -> Option<f64> {
        match self {
            ResolvedValue::Column { index, .. } | ResolvedValue::LastNumeric { index, .. } => {
                table.cell(row, *index).and_then(parse_number)
            }
            ResolvedValue::Mean { columns } => {
                let (sum, n) = columns
                    .iter()
                    .filter_map(|(_, idx)| table.cell(row, *idx).and_then(parse_number))
                    .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                (n > 0).then(|| sum / n as f64)
            }
        }
    }
}

pub fn resolve_axis(table: &RawTable, spec: &SeriesSpec) -> Result<(String, usize), NormalizeError> {
    table
        .resolve(&spec.axis_column_candidates)
        .map(|(name, idx)| (name.to_string(), idx))
        .ok_or_else(|| NormalizeError::MissingAxisColumn {
            indicator: spec.id.clone(),
            candidates: spec.axis_column_candidates.clone(),
        })
}

/// Last column other than `skip` whose populated cells all parse as numbers.
fn last_numeric_column(table: &RawTable, skip: usize) -> Option<usize> {
    (0..table.headers.len()).rev().filter(|&i| i != skip).find(|&i| {
        let mut populated = (0..table.rows.len()).filter_map(|r| table.cell(r, i)).peekable();
        populated.peek().is_some() && populated.all(|c| parse_number(c).is_some())
    })
}

pub fn resolve_value(
    table: &RawTable,
    spec: &SeriesSpec,
    axis_index: usize,
) -> Result<ResolvedValue, NormalizeError> {
    let missing = || NormalizeError::MissingValueColumn {
        indicator: spec.id.clone(),
        candidates: spec.value.names().to_vec(),
    };

    match &spec.value {
        ValueSpec::MeanOf { columns } => {
            let present: Vec<(String, usize)> = columns
                .iter()
                .filter_map(|c| table.column_index(c).map(|i| (c.clone(), i)))
                .collect();
            if present.is_empty() {
                return Err(missing());
            }
            if present.len() < columns.len() {
                debug!(
                    indicator = %spec.id,
                    present = present.len(),
                    expected = columns.len(),
                    "averaging over a subset of sub-period columns"
                );
            }
            Ok(ResolvedValue::Mean { columns: present })
        }
        ValueSpec::Column {
            candidates,
            last_numeric_fallback,
        } => {
            if let Some((name, index)) = table.resolve(candidates) {
                return Ok(ResolvedValue::Column {
                    name: name.to_string(),
                    index,
                });
            }
            if !last_numeric_fallback {
                return Err(missing());
            }
            let index = last_numeric_column(table, axis_index).ok_or_else(missing)?;
            let name = table.headers[index].clone();
            warn!(
                indicator = %spec.id,
                column = %name,
                "no candidate value column present; using last numeric column"
            );
            Ok(ResolvedValue::LastNumeric { name, index })
        }
    }
}
