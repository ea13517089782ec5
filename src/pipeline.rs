// src/pipeline.rs

use crate::config::SeriesSpec;
use crate::error::{Diagnostic, Origin, PipelineError, Stage};
use crate::fetch::{FetchCache, Fetcher};
use crate::normalize::{normalize, NormalizedSeries};
use std::sync::Arc;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::{error, info, instrument, warn};

/// Result of one indicator's fetch+normalize cycle.
#[derive(Debug)]
pub struct IndicatorReport {
    pub spec: SeriesSpec,
    /// `None` when no table could be obtained at all.
    pub origin: Option<Origin>,
    pub cached: bool,
    pub series: Result<NormalizedSeries, PipelineError>,
    pub diagnostics: Vec<Diagnostic>,
}

impl IndicatorReport {
    pub fn is_ok(&self) -> bool {
        self.series.is_ok()
    }
}

/// Fetcher + memo cache. Indicators are independent: a failure only ever
/// affects its own report.
pub struct Pipeline {
    fetcher: Fetcher,
    cache: FetchCache,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(fetcher: Fetcher, concurrency: usize) -> Self {
        Self {
            fetcher,
            cache: FetchCache::new(),
            concurrency: concurrency.max(1),
        }
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    /// Drop the memoized table for `spec` so the next load refetches.
    pub fn refresh(&self, spec: &SeriesSpec) -> bool {
        self.cache.invalidate(spec)
    }

    #[instrument(level = "info", skip(self, spec), fields(indicator = %spec.id))]
    pub async fn load(&self, spec: &SeriesSpec) -> IndicatorReport {
        let fetched = self
            .cache
            .get_or_fetch(spec, || self.fetcher.fetch(spec))
            .await;

        let (outcome, cached) = match fetched {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "no data for indicator");
                return IndicatorReport {
                    spec: spec.clone(),
                    origin: None,
                    cached: false,
                    diagnostics: e.diagnostics(&spec.id),
                    series: Err(e.into()),
                };
            }
        };

        let mut diagnostics = outcome.diagnostics.clone();
        let series = normalize(&outcome.table, spec).map_err(|e| {
            warn!(error = %e, "normalization failed");
            diagnostics.push(Diagnostic::new(&spec.id, Stage::Normalize, &e));
            PipelineError::from(e)
        });
        if let Ok(s) = &series {
            info!(
                points = s.len(),
                origin = %outcome.origin,
                cached,
                "indicator ready"
            );
        }

        IndicatorReport {
            spec: spec.clone(),
            origin: Some(outcome.origin),
            cached,
            series,
            diagnostics,
        }
    }

    /// Load every spec on its own task, at most `concurrency` at a time.
    /// Reports come back in input order. Dropping the returned future aborts
    /// the tasks still running.
    pub async fn load_all(self: &Arc<Self>, specs: Vec<SeriesSpec>) -> Vec<IndicatorReport> {
        let sem = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (idx, spec) in specs.iter().enumerate() {
            let pipeline = Arc::clone(self);
            let sem = Arc::clone(&sem);
            let spec = spec.clone();
            tasks.spawn(async move {
                let _permit = sem.acquire_owned().await.ok();
                (idx, pipeline.load(&spec).await)
            });
        }

        let mut done: Vec<Option<IndicatorReport>> = specs.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, report)) => done[idx] = Some(report),
                Err(e) => error!(error = %e, "indicator task failed"),
            }
        }

        specs
            .into_iter()
            .zip(done)
            .map(|(spec, report)| {
                report.unwrap_or_else(|| {
                    let err = PipelineError::Aborted("indicator task ended without a report".into());
                    IndicatorReport {
                        diagnostics: vec![Diagnostic::new(&spec.id, Stage::Task, &err)],
                        spec,
                        origin: None,
                        cached: false,
                        series: Err(err),
                    }
                })
            })
            .collect()
    }
}
