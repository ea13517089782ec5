// src/fetch/local.rs

use crate::error::FetchError;
use std::path::Path;
use tokio::fs;

/// Read the on-disk cached copy. A missing path is the same failure as a
/// missing file. Invalid UTF-8 is replaced, as for the remote body.
pub async fn read_fallback(path: Option<&Path>) -> Result<String, FetchError> {
    let path = path.ok_or_else(|| FetchError::LocalFallbackMissing {
        path: None,
        message: "no local fallback configured".into(),
    })?;
    let bytes = fs::read(path)
        .await
        .map_err(|e| FetchError::LocalFallbackMissing {
            path: Some(path.to_path_buf()),
            message: e.to_string(),
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
