// src/report.rs

use crate::error::{Diagnostic, Origin};
use crate::normalize::{NormalizedSeries, SeriesPoint};
use crate::pipeline::IndicatorReport;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{fs, path::Path};

/// Number of scaled values handed over as the sparkline trend.
pub const TREND_LEN: usize = 24;

/// What the presentation layer needs to render one risk card.
#[derive(Debug, Serialize)]
pub struct IndicatorSnapshot<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub unit: Option<&'a str>,
    pub origin: Option<Origin>,
    pub cached: bool,
    /// Latest scaled value, `None` when the indicator failed.
    pub risk: Option<f64>,
    pub latest: Option<&'a SeriesPoint>,
    pub trend: Vec<f64>,
    pub series: Option<&'a NormalizedSeries>,
    pub error: Option<String>,
    pub diagnostics: &'a [Diagnostic],
}

#[derive(Debug, Serialize)]
pub struct DashboardSnapshot<'a> {
    pub generated_at: DateTime<Utc>,
    pub indicators: Vec<IndicatorSnapshot<'a>>,
}

impl<'a> IndicatorSnapshot<'a> {
    pub fn from_report(report: &'a IndicatorReport) -> Self {
        let series = report.series.as_ref().ok();
        let latest = series.and_then(|s| s.latest());
        Self {
            id: &report.spec.id,
            title: &report.spec.title,
            unit: report.spec.unit.as_deref(),
            origin: report.origin,
            cached: report.cached,
            risk: latest.map(|p| p.scaled_value),
            latest,
            trend: series.map(|s| s.tail(TREND_LEN)).unwrap_or_default(),
            series,
            error: report.series.as_ref().err().map(|e| e.to_string()),
            diagnostics: &report.diagnostics,
        }
    }
}

pub fn snapshot(reports: &[IndicatorReport]) -> DashboardSnapshot<'_> {
    DashboardSnapshot {
        generated_at: Utc::now(),
        indicators: reports.iter().map(IndicatorSnapshot::from_report).collect(),
    }
}

/// Write the snapshot as pretty JSON. Goes through a sibling temp file so a
/// reader never sees a half-written document.
pub fn write_snapshot<P: AsRef<Path>>(path: P, snap: &DashboardSnapshot<'_>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {:?}", parent))?;
    }
    let json = serde_json::to_string_pretty(snap).context("serializing snapshot")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("writing {:?}", tmp))?;
    fs::rename(&tmp, path).with_context(|| format!("renaming {:?} -> {:?}", tmp, path))?;
    Ok(())
}

/// One human-readable line per indicator.
pub fn summary_line(report: &IndicatorReport) -> String {
    let name = if report.spec.title.is_empty() {
        &report.spec.id
    } else {
        &report.spec.title
    };
    match &report.series {
        Ok(series) => match series.latest() {
            Some(p) => format!(
                "{}: {}% ({} {}, {})",
                name,
                (p.scaled_value * 100.0).round() as i64,
                p.axis,
                report
                    .origin
                    .map_or_else(|| "unknown".to_string(), |o| o.to_string()),
                if report.cached { "cached" } else { "fresh" }
            ),
            None => format!("{}: empty series", name),
        },
        Err(e) => format!("{}: unavailable ({})", name, e),
    }
}
