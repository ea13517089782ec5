// src/fetch/remote.rs
use crate::error::{FetchError, TransportKind};
use reqwest::Client;
use std::error::Error as _;
use std::time::Duration;
use tracing::debug;

fn classify(e: &reqwest::Error) -> TransportKind {
    if e.is_timeout() {
        TransportKind::Timeout
    } else if let Some(status) = e.status() {
        TransportKind::Status(status.as_u16())
    } else if e.is_connect() {
        TransportKind::Connect
    } else if e.is_body() || e.is_decode() {
        TransportKind::Body
    } else {
        TransportKind::Request
    }
}

fn transport_failure(url: &str, e: reqwest::Error) -> FetchError {
    let mut message = e.to_string();
    let mut cur = e.source();
    while let Some(cause) = cur {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        cur = cause.source();
    }
    FetchError::TransportFailure {
        url: url.to_string(),
        kind: classify(&e),
        message,
    }
}

/// GET `url` as text. The whole exchange, body included, is bounded by
/// `timeout`. Single attempt, no retries.
pub async fn get_text(client: &Client, url: &str, timeout: Duration) -> Result<String, FetchError> {
    debug!(%url, ?timeout, "fetching text");
    client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| transport_failure(url, e))?
        .error_for_status()
        .map_err(|e| transport_failure(url, e))?
        .text()
        .await
        .map_err(|e| transport_failure(url, e))
}
