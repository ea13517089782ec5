use anyhow::Result;
use boundscraper::{
    config::AppConfig,
    fetch::Fetcher,
    pipeline::Pipeline,
    report::{snapshot, summary_line, write_snapshot},
};
use reqwest::Client;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,boundscraper=debug"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    let cfg = AppConfig::from_env()?;
    let specs = cfg.indicators()?;
    info!(
        indicators = specs.len(),
        timeout = ?cfg.timeout,
        concurrency = cfg.concurrency,
        source = ?cfg.indicators_path,
        "configured"
    );

    // ─── 3) fetch + normalize every indicator ────────────────────────
    let client = Client::builder().gzip(true).build()?;
    let pipeline = Arc::new(Pipeline::new(
        Fetcher::new(client, cfg.timeout),
        cfg.concurrency,
    ));
    let start = Instant::now();

    let reports = tokio::select! {
        reports = pipeline.load_all(specs) => reports,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted; abandoning in-flight fetches");
            return Ok(());
        }
    };
    info!(elapsed = ?start.elapsed(), "all indicators loaded");

    // ─── 4) summary + hand-off to the presentation layer ────────────
    for report in &reports {
        let line = summary_line(report);
        if report.is_ok() {
            info!("{}", line);
        } else {
            error!("{}", line);
        }
        for diag in &report.diagnostics {
            warn!("{}", diag);
        }
    }

    write_snapshot(&cfg.output_path, &snapshot(&reports))?;
    info!(path = %cfg.output_path.display(), "wrote snapshot");

    let failed = reports.iter().filter(|r| !r.is_ok()).count();
    if failed > 0 {
        warn!(failed, total = reports.len(), "some indicators unavailable");
    }
    Ok(())
}
