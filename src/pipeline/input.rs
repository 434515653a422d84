//! Input resolution for one-shot extraction: a local path or a URL becomes
//! bytes plus a sniffed MIME type.
//!
//! The HTTP surface gets its MIME type from the multipart part; here there is
//! no such header worth trusting (extensions lie, servers send
//! `application/octet-stream`), so the type is taken from the magic bytes.

use crate::error::ExtractError;
use std::path::PathBuf;
use tracing::{debug, info};

/// Bytes of the document and what they look like.
#[derive(Debug, Clone)]
pub struct LoadedInput {
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load a local file or download a URL.
pub async fn load_input(input: &str, timeout_secs: u64) -> Result<LoadedInput, ExtractError> {
    let (name, bytes) = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(input).await?
    };
    let mime = sniff_mime(&bytes);
    debug!("Loaded '{}': {} bytes, {}", name, bytes.len(), mime);
    Ok(LoadedInput { name, bytes, mime })
}

/// MIME type from magic bytes; `application/octet-stream` when unknown.
pub fn sniff_mime(bytes: &[u8]) -> String {
    infer::get(bytes)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

async fn read_local(path_str: &str) -> Result<(String, Vec<u8>), ExtractError> {
    let path = PathBuf::from(path_str);
    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ExtractError::FileNotFound { path: path.clone() },
        _ => ExtractError::InvalidRequest(format!("cannot read '{}': {e}", path.display())),
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path_str.to_string());
    Ok((name, bytes))
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<(String, Vec<u8>), ExtractError> {
    info!("Downloading timetable from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ExtractError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            ExtractError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ExtractError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    Ok((filename_from_url(url), bytes.to_vec()))
}

/// Last path segment of the URL, or a generic name.
fn filename_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|last| !last.is_empty())
        .unwrap_or_else(|| "download".to_string())
}
