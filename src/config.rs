// src/config.rs

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(18);
pub const DEFAULT_CONCURRENCY: usize = 3;
pub const DEFAULT_SCAN_LINES: usize = 40;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// How cells of the axis column are coerced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisKind {
    /// Integer year, then calendar date, then decimal year.
    #[default]
    Auto,
    Year,
    Date,
    DecimalYear,
}

/// Where the measurement comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSpec {
    /// First present column wins; optionally fall back to the last numeric column.
    Column {
        candidates: Vec<String>,
        #[serde(default)]
        last_numeric_fallback: bool,
    },
    /// Per-row arithmetic mean of the populated sub-period columns.
    MeanOf { columns: Vec<String> },
}

impl ValueSpec {
    pub fn names(&self) -> &[String] {
        match self {
            ValueSpec::Column { candidates, .. } => candidates,
            ValueSpec::MeanOf { columns } => columns,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resample {
    Annual,
}

/// Policy for locating the header line below a free-text preamble.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeaderDetection {
    #[serde(default = "default_scan_lines")]
    pub scan_lines: usize,
    /// Every token must appear as a cell of the header line.
    #[serde(default)]
    pub required_tokens: Vec<String>,
    /// At least one token must appear, unless empty.
    #[serde(default)]
    pub any_tokens: Vec<String>,
    #[serde(default)]
    pub comment: Option<char>,
}

fn default_scan_lines() -> usize {
    DEFAULT_SCAN_LINES
}

impl Default for HeaderDetection {
    fn default() -> Self {
        Self {
            scan_lines: DEFAULT_SCAN_LINES,
            required_tokens: Vec::new(),
            any_tokens: Vec::new(),
            comment: None,
        }
    }
}

/// One indicator: where to get it and how to read it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesSpec {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub unit: Option<String>,
    pub primary_url: String,
    #[serde(default)]
    pub local_fallback_path: Option<PathBuf>,
    pub axis_column_candidates: Vec<String>,
    #[serde(default)]
    pub axis_kind: AxisKind,
    /// Written as a one-key map, e.g. `value: { mean_of: { columns: [...] } }`.
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub value: ValueSpec,
    #[serde(default)]
    pub resample: Option<Resample>,
    #[serde(default)]
    pub header_detection: HeaderDetection,
}

impl SeriesSpec {
    /// NASA GISTEMP v4 global land-ocean temperature anomaly, annual mean of
    /// the monthly columns.
    pub fn gistemp() -> Self {
        let months: Vec<String> = MONTHS.iter().map(|m| m.to_string()).collect();
        Self {
            id: "f1_global_temperature".into(),
            title: "F1 – Global Temperature".into(),
            unit: Some("°C anomaly".into()),
            primary_url: "https://data.giss.nasa.gov/gistemp/tabledata_v4/GLB.Ts+dSST.csv".into(),
            local_fallback_path: Some(PathBuf::from("data/GLB.Ts+dSST.csv")),
            axis_column_candidates: vec!["Year".into(), "year".into()],
            axis_kind: AxisKind::Year,
            value: ValueSpec::MeanOf { columns: months },
            resample: None,
            header_detection: HeaderDetection {
                required_tokens: vec!["Year".into()],
                any_tokens: MONTHS.iter().map(|m| m.to_string()).collect(),
                ..HeaderDetection::default()
            },
        }
    }

    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            bail!("indicator with empty id");
        }
        Url::parse(&self.primary_url)
            .with_context(|| format!("{}: invalid primary_url {}", self.id, self.primary_url))?;
        if self.axis_column_candidates.is_empty() {
            bail!("{}: axis_column_candidates is empty", self.id);
        }
        if self.value.names().is_empty() {
            bail!("{}: value column list is empty", self.id);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct IndicatorFile {
    indicators: Vec<SeriesSpec>,
}

/// Parse an indicator list from YAML text.
pub fn parse_indicators(text: &str) -> Result<Vec<SeriesSpec>> {
    let file: IndicatorFile = serde_yaml::from_str(text).context("parsing indicator YAML")?;
    if file.indicators.is_empty() {
        bail!("indicator file lists no indicators");
    }
    for spec in &file.indicators {
        spec.validate()?;
    }
    Ok(file.indicators)
}

pub fn load_indicators<P: AsRef<Path>>(path: P) -> Result<Vec<SeriesSpec>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).with_context(|| format!("reading {:?}", path))?;
    parse_indicators(&text).with_context(|| format!("loading {:?}", path))
}

/// Process settings taken from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub indicators_path: Option<PathBuf>,
    pub timeout: Duration,
    pub concurrency: usize,
    pub output_path: PathBuf,
}

impl AppConfig {
    /// Reads `BOUNDS_CONFIG`, `BOUNDS_TIMEOUT_SECS`, `BOUNDS_CONCURRENCY` and `BOUNDS_OUT`.
    pub fn from_env() -> Result<Self> {
        let timeout = match env::var("BOUNDS_TIMEOUT_SECS") {
            Ok(v) => Duration::from_secs(
                v.parse()
                    .with_context(|| format!("BOUNDS_TIMEOUT_SECS={:?} is not a number", v))?,
            ),
            Err(_) => DEFAULT_TIMEOUT,
        };
        let concurrency = match env::var("BOUNDS_CONCURRENCY") {
            Ok(v) => v
                .parse::<usize>()
                .with_context(|| format!("BOUNDS_CONCURRENCY={:?} is not a number", v))?
                .max(1),
            Err(_) => DEFAULT_CONCURRENCY,
        };
        Ok(Self {
            indicators_path: env::var_os("BOUNDS_CONFIG").map(PathBuf::from),
            timeout,
            concurrency,
            output_path: env::var_os("BOUNDS_OUT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("dashboard.json")),
        })
    }

    /// The configured indicator list, or the built-in GISTEMP preset.
    pub fn indicators(&self) -> Result<Vec<SeriesSpec>> {
        match &self.indicators_path {
            Some(path) => load_indicators(path),
            None => Ok(vec![SeriesSpec::gistemp()]),
        }
    }
}
