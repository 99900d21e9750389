//! Input resolution: read a user-supplied path or URL into memory.
//!
//! Both extractors work from a byte buffer, so a URL is downloaded straight
//! into memory and a local file is read whole. The upload cap is enforced
//! before the bytes are handed to a parser: for local files from metadata
//! (nothing is read), for downloads from `Content-Length` when present and
//! chunk by chunk as the body arrives, so an unannounced oversized body is
//! dropped as soon as it passes the limit.

use crate::error::Pdf2QuizError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Raw document bytes plus a display name.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// File name shown to the user (last path or URL segment).
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Fail with `DocumentTooLarge` when `size` exceeds `limit`.
pub fn check_size(size: u64, limit: u64) -> Result<(), Pdf2QuizError> {
    if size > limit {
        return Err(Pdf2QuizError::DocumentTooLarge { size, limit });
    }
    Ok(())
}

/// Load `input` (a local path or an http(s) URL) into memory.
pub async fn load_input(
    input: &str,
    max_bytes: u64,
    timeout_secs: u64,
) -> Result<LoadedDocument, Pdf2QuizError> {
    if is_url(input) {
        download_url(input, max_bytes, timeout_secs).await
    } else {
        load_local(Path::new(input), max_bytes).await
    }
}

/// Read a local file, mapping I/O failures to user-facing errors.
pub async fn load_local(path: &Path, max_bytes: u64) -> Result<LoadedDocument, Pdf2QuizError> {
    let meta = tokio::fs::metadata(path).await.map_err(|e| io_error(path, e))?;
    if !meta.is_file() {
        return Err(Pdf2QuizError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    check_size(meta.len(), max_bytes)?;

    let bytes = tokio::fs::read(path).await.map_err(|e| io_error(path, e))?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(LoadedDocument { name, bytes })
}

fn io_error(path: &Path, e: std::io::Error) -> Pdf2QuizError {
    let path: PathBuf = path.to_path_buf();
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => Pdf2QuizError::PermissionDenied { path },
        std::io::ErrorKind::NotFound => Pdf2QuizError::FileNotFound { path },
        _ => Pdf2QuizError::Internal(format!("failed to read {}: {e}", path.display())),
    }
}

/// Download a URL into memory.
async fn download_url(
    url: &str,
    max_bytes: u64,
    timeout_secs: u64,
) -> Result<LoadedDocument, Pdf2QuizError> {
    info!("Downloading PDF from: {}", url);

    let failed = |reason: String| Pdf2QuizError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {timeout_secs}s"))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }
    if let Some(len) = response.content_length() {
        check_size(len, max_bytes)?;
    }

    let mut response = response;
    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| failed(e.to_string()))? {
        check_size((bytes.len() + chunk.len()) as u64, max_bytes)?;
        bytes.extend_from_slice(&chunk);
    }

    info!("Downloaded {} bytes", bytes.len());
    Ok(LoadedDocument {
        name: extract_filename(url),
        bytes,
    })
}

/// Last non-empty URL path segment, or `downloaded.pdf`.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}
