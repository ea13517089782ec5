// src/normalize/axis.rs

use crate::config::AxisKind;
use crate::table::utils::clean_str;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

/// A coerced value of the time/period axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Axis {
    Year(i32),
    Date(NaiveDate),
    /// Fractional year, e.g. `2002.29` for mid-April 2002.
    DecimalYear(f64),
}

impl Axis {
    pub fn year(&self) -> i32 {
        match self {
            Axis::Year(y) => *y,
            Axis::Date(d) => d.year(),
            Axis::DecimalYear(y) => y.floor() as i32,
        }
    }

    /// Position on a common decimal-year scale, used for ordering.
    pub fn ordinal(&self) -> f64 {
        match self {
            Axis::Year(y) => *y as f64,
            Axis::Date(d) => {
                let days = NaiveDate::from_ymd_opt(d.year(), 12, 31)
                    .map_or(365, |end| end.ordinal());
                d.year() as f64 + d.ordinal0() as f64 / days as f64
            }
            Axis::DecimalYear(y) => *y,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Year(y) => write!(f, "{}", y),
            Axis::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Axis::DecimalYear(y) => write!(f, "{:.3}", y),
        }
    }
}

fn parse_year(s: &str) -> Option<i32> {
    if let Ok(y) = s.parse::<i32>() {
        return Some(y);
    }
    // "2020.0" from spreadsheet exports
    let f = s.parse::<f64>().ok()?;
    (f.is_finite() && f.fract() == 0.0).then(|| f as i32)
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"];

fn parse_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            let trimmed = s.trim_end_matches('Z');
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(trimmed, f).ok())
                .map(|dt| dt.date())
        })
        // "YYYY-MM" monthly stamps
        .or_else(|| NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").ok())
}

fn parse_decimal_year(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce one axis cell. `None` drops the row.
pub fn coerce_axis(raw: &str, kind: AxisKind) -> Option<Axis> {
    let s = clean_str(raw);
    if s.is_empty() {
        return None;
    }
    match kind {
        AxisKind::Year => parse_year(&s).map(Axis::Year),
        AxisKind::Date => parse_date(&s).map(Axis::Date),
        AxisKind::DecimalYear => parse_decimal_year(&s).map(Axis::DecimalYear),
        AxisKind::Auto => parse_year(&s)
            .map(Axis::Year)
            .or_else(|| parse_date(&s).map(Axis::Date))
            .or_else(|| parse_decimal_year(&s).map(Axis::DecimalYear)),
    }
}
