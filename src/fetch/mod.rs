// src/fetch/mod.rs
pub mod cache;
pub mod local;
pub mod remote;

pub use cache::FetchCache;

use crate::config::{SeriesSpec, DEFAULT_TIMEOUT};
use crate::error::{Diagnostic, FetchError, Origin};
use crate::table::{parse_text, RawTable};
use reqwest::Client;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// A parsed table plus the record of how it was obtained.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub table: RawTable,
    pub origin: Origin,
    /// Failures encountered on the way, e.g. the remote error that caused
    /// the fallback.
    pub diagnostics: Vec<Diagnostic>,
}

/// Fetches one dataset: remote first, then the local cached copy once.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    timeout: Duration,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(Client::new(), DEFAULT_TIMEOUT)
    }
}

impl Fetcher {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[instrument(level = "info", skip(self, spec), fields(indicator = %spec.id))]
    pub async fn fetch(&self, spec: &SeriesSpec) -> Result<FetchOutcome, FetchError> {
        let mut diagnostics = Vec::new();

        let remote_err =
            match remote::get_text(&self.client, &spec.primary_url, self.timeout).await {
                Ok(body) => match parse_text(&body, &spec.header_detection) {
                    Some(table) => {
                        info!(
                            url = %spec.primary_url,
                            columns = table.headers.len(),
                            rows = table.rows.len(),
                            "fetched remote table"
                        );
                        return Ok(FetchOutcome {
                            table,
                            origin: Origin::Remote,
                            diagnostics,
                        });
                    }
                    None => FetchError::EmptyOrUnparseable {
                        origin: Origin::Remote,
                    },
                },
                Err(e) => e,
            };
        warn!(error = %remote_err, "remote fetch failed, trying local fallback");
        diagnostics.extend(remote_err.diagnostics(&spec.id));

        let local_err = match local::read_fallback(spec.local_fallback_path.as_deref()).await {
            Ok(text) => match parse_text(&text, &spec.header_detection) {
                Some(table) => {
                    info!(
                        path = ?spec.local_fallback_path,
                        rows = table.rows.len(),
                        "using local fallback table"
                    );
                    return Ok(FetchOutcome {
                        table,
                        origin: Origin::LocalFallback,
                        diagnostics,
                    });
                }
                None => FetchError::EmptyOrUnparseable {
                    origin: Origin::LocalFallback,
                },
            },
            Err(e) => e,
        };
        warn!(error = %local_err, "local fallback failed");

        Err(FetchError::NoDataAvailable {
            remote: Box::new(remote_err),
            local: Box::new(local_err),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::test_server::*;
    use super::*;
    use crate::error::{Stage, TransportKind};
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tracing_subscriber::{fmt, EnvFilter};

    const GISTEMP_BODY: &str = "Land-Ocean: Global Means\n\
        Year,Jan,Feb,Mar,Apr,May,Jun,Jul,Aug,Sep,Oct,Nov,Dec,J-D\n\
        2020,1.0,1.2,1.0,1.0,1.0,1.0,1.0,1.0,1.0,1.0,1.0,0.8,1.0\n\
        2021,1.1,1.2,1.05,1.05,1.05,1.05,1.05,1.05,1.05,1.05,1.0,0.9,1.05\n";

    fn init_logging() {
        let _ = fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_test_writer()
            .try_init();
    }

    fn spec_for(url: String, fallback: Option<&NamedTempFile>) -> SeriesSpec {
        let mut spec = SeriesSpec::gistemp();
        spec.primary_url = url;
        spec.local_fallback_path = fallback.map(|f| f.path().to_path_buf());
        spec
    }

    fn fallback_file(text: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(text.as_bytes()).unwrap();
        f
    }

    #[tokio::test]
    async fn remote_success_skips_fallback() {
        init_logging();
        let url = serve_once("200 OK", GISTEMP_BODY).await;
        let out = Fetcher::default().fetch(&spec_for(url, None)).await.unwrap();
        assert_eq!(out.origin, Origin::Remote);
        assert!(out.diagnostics.is_empty());
        assert_eq!(out.table.headers[0], "Year");
        assert_eq!(out.table.rows.len(), 2);
    }

    #[tokio::test]
    async fn transport_failure_falls_back_to_local_copy() {
        init_logging();
        let local = fallback_file(GISTEMP_BODY);
        let spec = spec_for(refused_url().await, Some(&local));
        let out = Fetcher::default().fetch(&spec).await.unwrap();
        assert_eq!(out.origin, Origin::LocalFallback);
        assert_eq!(out.table.rows.len(), 2);
        assert_eq!(out.diagnostics.len(), 1);
        assert_eq!(out.diagnostics[0].stage, Stage::RemoteFetch);
    }

    #[tokio::test]
    async fn non_success_status_falls_back() {
        let local = fallback_file(GISTEMP_BODY);
        let url = serve_once("503 Service Unavailable", "busy").await;
        let out = Fetcher::default()
            .fetch(&spec_for(url, Some(&local)))
            .await
            .unwrap();
        assert_eq!(out.origin, Origin::LocalFallback);
        assert!(out.diagnostics[0].message.contains("HTTP 503"));
    }

    #[tokio::test]
    async fn unparseable_body_falls_back() {
        let local = fallback_file(GISTEMP_BODY);
        let url = serve_once("200 OK", "").await;
        let out = Fetcher::default()
            .fetch(&spec_for(url, Some(&local)))
            .await
            .unwrap();
        assert_eq!(out.origin, Origin::LocalFallback);
        assert_eq!(out.diagnostics[0].stage, Stage::RemoteParse);
    }

    #[tokio::test]
    async fn timeout_is_bounded() {
        let fetcher = Fetcher::new(Client::new(), Duration::from_millis(200));
        let err = fetcher
            .fetch(&spec_for(serve_silence().await, None))
            .await
            .unwrap_err();
        match err {
            FetchError::NoDataAvailable { remote, local } => {
                assert!(matches!(
                    *remote,
                    FetchError::TransportFailure {
                        kind: TransportKind::Timeout,
                        ..
                    }
                ));
                assert!(matches!(
                    *local,
                    FetchError::LocalFallbackMissing { path: None, .. }
                ));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_fallback_file_reports_both_failures() {
        let mut spec = spec_for(refused_url().await, None);
        spec.local_fallback_path = Some("does/not/exist.csv".into());
        let err = Fetcher::default().fetch(&spec).await.unwrap_err();
        let diags = err.diagnostics(&spec.id);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[1].stage, Stage::LocalRead);
        assert!(diags[1].message.contains("does/not/exist.csv"));
    }
}
