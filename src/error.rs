// src/error.rs

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Where a table came from: the remote source or the on-disk cached copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Remote,
    LocalFallback,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Remote => f.write_str("remote"),
            Origin::LocalFallback => f.write_str("local fallback"),
        }
    }
}

/// Classification of a failed HTTP exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Timeout,
    Connect,
    Status(u16),
    Body,
    Request,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Timeout => f.write_str("timeout"),
            TransportKind::Connect => f.write_str("connect"),
            TransportKind::Status(code) => write!(f, "HTTP {}", code),
            TransportKind::Body => f.write_str("body"),
            TransportKind::Request => f.write_str("request"),
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    /// Timeout, DNS/connect failure or non-2xx status. Triggers the fallback.
    #[error("{kind} failure fetching {url}: {message}")]
    TransportFailure {
        url: String,
        kind: TransportKind,
        message: String,
    },

    #[error("local fallback {path:?} unavailable: {message}")]
    LocalFallbackMissing { path: Option<PathBuf>, message: String },

    /// Header detection and the direct parse both produced nothing usable.
    #[error("{origin} data is empty or unparseable")]
    EmptyOrUnparseable { origin: Origin },

    #[error("no data available (remote: {remote}; local: {local})")]
    NoDataAvailable {
        remote: Box<FetchError>,
        local: Box<FetchError>,
    },
}

impl FetchError {
    /// Stage at which this failure happened.
    pub fn stage(&self) -> Stage {
        match self {
            FetchError::TransportFailure { .. } => Stage::RemoteFetch,
            FetchError::LocalFallbackMissing { .. } | FetchError::NoDataAvailable { .. } => {
                Stage::LocalRead
            }
            FetchError::EmptyOrUnparseable {
                origin: Origin::Remote,
            } => Stage::RemoteParse,
            FetchError::EmptyOrUnparseable {
                origin: Origin::LocalFallback,
            } => Stage::LocalParse,
        }
    }

    /// One diagnostic per underlying failure.
    pub fn diagnostics(&self, indicator: &str) -> Vec<Diagnostic> {
        match self {
            FetchError::NoDataAvailable { remote, local } => {
                let mut out = remote.diagnostics(indicator);
                out.extend(local.diagnostics(indicator));
                out
            }
            other => vec![Diagnostic::new(indicator, other.stage(), other)],
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum NormalizeError {
    #[error("{indicator}: none of the axis columns {candidates:?} present")]
    MissingAxisColumn {
        indicator: String,
        candidates: Vec<String>,
    },

    #[error("{indicator}: none of the value columns {candidates:?} present")]
    MissingValueColumn {
        indicator: String,
        candidates: Vec<String>,
    },

    #[error("{indicator}: no valid rows after dropping {dropped} of {total}")]
    NoValidRows {
        indicator: String,
        total: usize,
        dropped: usize,
    },

    #[error("{indicator}: degenerate range (min {min}, max {max})")]
    DegenerateRange { indicator: String, min: f64, max: f64 },
}

/// Failure of one indicator's fetch+normalize cycle.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error("indicator task aborted: {0}")]
    Aborted(String),
}

/// The stage of the pipeline a diagnostic was recorded at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    RemoteFetch,
    RemoteParse,
    LocalRead,
    LocalParse,
    Normalize,
    Task,
}

/// A renderable record of something that went wrong for one indicator.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub indicator: String,
    pub stage: Stage,
    pub message: String,
    /// `source()` chain of the underlying error, outermost first.
    pub chain: Vec<String>,
}

impl Diagnostic {
    pub fn new(indicator: &str, stage: Stage, err: &(dyn std::error::Error + 'static)) -> Self {
        let mut chain = Vec::new();
        let mut cur = err.source();
        while let Some(e) = cur {
            chain.push(e.to_string());
            cur = e.source();
        }
        Self {
            indicator: indicator.to_string(),
            stage,
            message: err.to_string(),
            chain,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {:?}: {}", self.indicator, self.stage, self.message)?;
        for cause in &self.chain {
            write!(f, ": {}", cause)?;
        }
        Ok(())
    }
}
