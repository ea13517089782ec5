use anyhow::{bail, Context, Result};
use boundscraper::{
    config::{HeaderDetection, DEFAULT_TIMEOUT},
    fetch::remote::get_text,
    table::{locate_header, parse_text},
};
use reqwest::Client;
use std::{env, fs};
use tracing_subscriber::{fmt, EnvFilter};

/// Usage: inspect_source <URL|PATH> [REQUIRED_TOKEN ...]
///
/// Prints where the header line was found, the parsed columns and a few rows.
#[tokio::main]
async fn main() -> Result<()> {
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .try_init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("Usage: {} <URL|PATH> [REQUIRED_TOKEN ...]", args[0]);
    }
    let source = &args[1];
    let policy = HeaderDetection {
        required_tokens: args[2..].to_vec(),
        ..HeaderDetection::default()
    };

    let text = if source.starts_with("http://") || source.starts_with("https://") {
        get_text(&Client::new(), source, DEFAULT_TIMEOUT).await?
    } else {
        fs::read_to_string(source).with_context(|| format!("reading {}", source))?
    };

    println!("=== Source: {} ===", source);
    println!("Bytes:           {}", text.len());
    match locate_header(&text, &policy) {
        Some(idx) => println!("Header line:     {} (preamble of {} lines)", idx + 1, idx),
        None => println!("Header line:     not found in first {} lines", policy.scan_lines),
    }

    let table = parse_text(&text, &policy).context("no usable rows")?;
    println!("Rows:            {}", table.rows.len());
    println!();
    println!("=== Columns ===");
    for (i, h) in table.headers.iter().enumerate() {
        println!("{:>3}  {}", i, h);
    }
    println!();
    println!("=== First rows ===");
    for row in table.rows.iter().take(5) {
        println!("{}", row.join(" | "));
    }
    Ok(())
}
