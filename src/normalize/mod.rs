// src/normalize/mod.rs
pub mod axis;
pub mod resolve;

pub use axis::{coerce_axis, Axis};

use crate::config::{Resample, SeriesSpec};
use crate::error::NormalizeError;
use crate::table::RawTable;
use resolve::{resolve_axis, resolve_value};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// One record of a normalized series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub axis: Axis,
    pub raw_value: f64,
    /// `(raw_value - min) / (max - min)`, always within `[0, 1]`.
    pub scaled_value: f64,
}

/// An indicator rescaled against its own observed range, ascending by axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedSeries {
    pub indicator: String,
    pub unit: Option<String>,
    /// Column the values were read from (joined with `+` for sub-period means).
    pub value_column: String,
    pub min: f64,
    pub max: f64,
    points: Vec<SeriesPoint>,
}

impl NormalizedSeries {
    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent record: the value shown on a risk card.
    pub fn latest(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    /// Scaled values of the last `n` records, oldest first (sparkline input).
    pub fn tail(&self, n: usize) -> Vec<f64> {
        let start = self.points.len().saturating_sub(n);
        self.points[start..].iter().map(|p| p.scaled_value).collect()
    }
}

/// Group by calendar year of the axis and average.
fn resample_annual(values: Vec<(Axis, f64)>) -> Vec<(Axis, f64)> {
    let mut by_year: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for (axis, v) in values {
        let e = by_year.entry(axis.year()).or_insert((0.0, 0));
        e.0 += v;
        e.1 += 1;
    }
    by_year
        .into_iter()
        .map(|(y, (sum, n))| (Axis::Year(y), sum / n as f64))
        .collect()
}

/// Resolve, coerce, filter and rescale `table` according to `spec`.
#[instrument(level = "debug", skip(table, spec), fields(indicator = %spec.id, rows = table.rows.len()))]
pub fn normalize(table: &RawTable, spec: &SeriesSpec) -> Result<NormalizedSeries, NormalizeError> {
    let (axis_name, axis_idx) = resolve_axis(table, spec)?;
    let value = resolve_value(table, spec, axis_idx)?;
    debug!(axis = %axis_name, value = ?value, "columns resolved");

    let total = table.rows.len();
    let mut values: Vec<(Axis, f64)> = (0..total)
        .filter_map(|row| {
            let axis = table
                .cell(row, axis_idx)
                .and_then(|c| coerce_axis(c, spec.axis_kind))?;
            let v = value.value(table, row)?;
            Some((axis, v))
        })
        .collect();

    if values.is_empty() {
        return Err(NormalizeError::NoValidRows {
            indicator: spec.id.clone(),
            total,
            dropped: total,
        });
    }
    debug!(kept = values.len(), dropped = total - values.len(), "rows filtered");

    if let Some(Resample::Annual) = spec.resample {
        values = resample_annual(values);
    }

    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, v)| {
            (lo.min(*v), hi.max(*v))
        });
    if !min.is_finite() || !max.is_finite() || min == max {
        return Err(NormalizeError::DegenerateRange {
            indicator: spec.id.clone(),
            min,
            max,
        });
    }

    values.sort_by(|a, b| a.0.ordinal().total_cmp(&b.0.ordinal()));
    // Finite extremes far apart can overflow `max - min`; halve both sides then.
    let halved = !(max - min).is_finite();
    let scale = |v: f64| {
        if halved {
            (v / 2.0 - min / 2.0) / (max / 2.0 - min / 2.0)
        } else {
            (v - min) / (max - min)
        }
    };
    let points = values
        .into_iter()
        .map(|(axis, raw_value)| SeriesPoint {
            axis,
            raw_value,
            scaled_value: scale(raw_value),
        })
        .collect();

    let value_column = match value {
        resolve::ResolvedValue::Column { name, .. }
        | resolve::ResolvedValue::LastNumeric { name, .. } => name,
        resolve::ResolvedValue::Mean { columns } => columns
            .into_iter()
            .map(|(n, _)| n)
            .collect::<Vec<_>>()
            .join("+"),
    };

    Ok(NormalizedSeries {
        indicator: spec.id.clone(),
        unit: spec.unit.clone(),
        value_column,
        min,
        max,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AxisKind, ValueSpec};

    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    fn single_column_spec() -> SeriesSpec {
        let mut spec = SeriesSpec::gistemp();
        spec.id = "test".into();
        spec.axis_column_candidates = vec!["time".into(), "Year".into()];
        spec.axis_kind = AxisKind::Auto;
        spec.value = ValueSpec::Column {
            candidates: vec!["value".into()],
            last_numeric_fallback: false,
        };
        spec
    }

    fn series_table(values: &[(&str, &str)]) -> RawTable {
        RawTable::new(
            vec!["Year".into(), "value".into()],
            values
                .iter()
                .map(|(a, v)| vec![a.to_string(), v.to_string()])
                .collect(),
        )
    }

    #[test]
    fn endpoints_are_exact_and_scaling_is_monotonic() {
        let t = series_table(&[("2003", "5.0"), ("2001", "-1.0"), ("2002", "2.0"), ("2004", "0.5")]);
        let s = normalize(&t, &single_column_spec()).unwrap();
        let years: Vec<i32> = s.points().iter().map(|p| p.axis.year()).collect();
        assert_eq!(years, vec![2001, 2002, 2003, 2004]);

        let lo = s.points().iter().find(|p| p.raw_value == s.min).unwrap();
        let hi = s.points().iter().find(|p| p.raw_value == s.max).unwrap();
        assert_eq!(lo.scaled_value, 0.0);
        assert_eq!(hi.scaled_value, 1.0);

        let mut by_raw = s.points().to_vec();
        by_raw.sort_by(|a, b| a.raw_value.total_cmp(&b.raw_value));
        assert!(by_raw.windows(2).all(|w| w[0].scaled_value <= w[1].scaled_value));
    }

    #[test]
    fn scaled_value_recovers_interpolation_parameter() {
        let (min, max) = (-0.5, 1.25);
        let ts = [0.0, 0.1, 0.25, 0.5, 0.9, 1.0];
        let cells: Vec<(String, String)> = ts
            .iter()
            .enumerate()
            .map(|(i, t)| ((1990 + i).to_string(), (min + t * (max - min)).to_string()))
            .collect();
        let refs: Vec<(&str, &str)> = cells.iter().map(|(a, v)| (a.as_str(), v.as_str())).collect();
        let s = normalize(&series_table(&refs), &single_column_spec()).unwrap();
        for (p, t) in s.points().iter().zip(ts) {
            assert!((p.scaled_value - t).abs() < 1e-9, "{} vs {}", p.scaled_value, t);
        }
    }

    #[test]
    fn constant_series_is_degenerate() {
        let t = series_table(&[("2001", "0.7"), ("2002", "0.7"), ("2003", "0.7")]);
        let err = normalize(&t, &single_column_spec()).unwrap_err();
        assert!(matches!(err, NormalizeError::DegenerateRange { min, max, .. } if min == max));
    }

    #[test]
    fn extreme_finite_range_still_scales_into_unit_interval() {
        let t = series_table(&[("2001", "-1e308"), ("2002", "0"), ("2003", "1e308")]);
        let s = normalize(&t, &single_column_spec()).unwrap();
        let scaled: Vec<f64> = s.points().iter().map(|p| p.scaled_value).collect();
        assert!(scaled.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v)));
        assert_eq!(scaled[0], 0.0);
        assert!((scaled[1] - 0.5).abs() < 1e-12);
        assert_eq!(scaled[2], 1.0);
    }

    #[test]
    fn missing_axis_column_is_an_error() {
        let t = RawTable::new(
            vec!["date_of".into(), "value".into()],
            vec![vec!["2001".into(), "1".into()]],
        );
        assert!(matches!(
            normalize(&t, &single_column_spec()),
            Err(NormalizeError::MissingAxisColumn { .. })
        ));
    }

    #[test]
    fn invalid_rows_are_dropped_then_no_valid_rows() {
        let t = series_table(&[("n/a", "1.0"), ("2002", "***"), ("2003", "")]);
        assert_eq!(
            normalize(&t, &single_column_spec()),
            Err(NormalizeError::NoValidRows {
                indicator: "test".into(),
                total: 3,
                dropped: 3
            })
        );

        let t = series_table(&[("n/a", "1.0"), ("2002", "3.0"), ("2003", "4.0")]);
        assert_eq!(normalize(&t, &single_column_spec()).unwrap().len(), 2);
    }

    #[test]
    fn monthly_columns_to_annual_means_to_unit_range() {
        let y2020 = ["1.0", "1.2", "1.0", "1.0", "1.0", "1.0", "1.0", "1.0", "1.0", "1.0", "1.0", "0.8"];
        let y2021 = ["1.1", "1.2", "1.05", "1.05", "1.05", "1.05", "1.05", "1.05", "1.05", "1.05", "1.0", "0.9"];
        let mut headers = vec!["Year".to_string()];
        headers.extend(MONTHS.iter().map(|m| m.to_string()));
        let row = |year: &str, vals: &[&str; 12]| {
            let mut r = vec![year.to_string()];
            r.extend(vals.iter().map(|v| v.to_string()));
            r
        };
        let t = RawTable::new(headers, vec![row("2020", &y2020), row("2021", &y2021)]);

        let s = normalize(&t, &SeriesSpec::gistemp()).unwrap();
        assert_eq!(s.len(), 2);
        assert!((s.points()[0].raw_value - 1.0).abs() < 1e-9);
        assert!((s.points()[1].raw_value - 1.05).abs() < 1e-9);
        assert_eq!(s.tail(24), vec![0.0, 1.0]);
        assert_eq!(s.latest().unwrap().axis, Axis::Year(2021));
    }

    #[test]
    fn annual_resample_groups_sub_annual_axis() {
        let mut spec = single_column_spec();
        spec.axis_kind = AxisKind::DecimalYear;
        spec.resample = Some(Resample::Annual);
        let t = RawTable::new(
            vec!["time".into(), "value".into()],
            vec![
                vec!["2002.29".into(), "1.0".into()],
                vec!["2002.71".into(), "3.0".into()],
                vec!["2003.04".into(), "4.0".into()],
                vec!["2003.62".into(), "6.0".into()],
            ],
        );
        let s = normalize(&t, &spec).unwrap();
        let raws: Vec<f64> = s.points().iter().map(|p| p.raw_value).collect();
        assert_eq!(raws, vec![2.0, 5.0]);
        assert_eq!(s.points()[0].axis, Axis::Year(2002));
    }
}
