//! Streaming archive download into a temporary file.
//!
//! The temporary file lives in the configured work directory and is deleted
//! when the returned [`DownloadedArchive`] is dropped, so every early return
//! (bad status, broken stream, full disk) cleans up after itself.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::Client;
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::Reporter;

/// Failure while transferring one archive.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Transport failure, timeout, or broken body stream.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The mirror answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status {
        /// Status code returned.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// Writing the temporary file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A fully written archive waiting to be extracted.
#[derive(Debug)]
pub struct DownloadedArchive {
    file: NamedTempFile,
    /// Bytes written.
    pub size: u64,
}

impl DownloadedArchive {
    /// Path of the temporary archive.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the temporary archive, reporting a failed delete.
    ///
    /// # Errors
    ///
    /// Returns the IO error from removing the file.
    pub fn remove(self) -> std::io::Result<()> {
        self.file.close()
    }
}

/// Download `url` into a fresh temporary file under `work_dir`.
///
/// `label` names the archive in progress events.
///
/// # Errors
///
/// Returns [`DownloadError`] on transport, status, or write failures. The
/// partial file is removed before returning.
pub async fn download_archive(
    client: &Client,
    url: &str,
    work_dir: &Path,
    label: &str,
    timeout: Duration,
    reporter: &dyn Reporter,
) -> Result<DownloadedArchive, DownloadError> {
    let response = client.get(url).timeout(timeout).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let total_size = response.content_length();
    reporter.downloading(label, 0, total_size);

    let temp = tempfile::Builder::new()
        .prefix(&format!("{label}."))
        .suffix(".part")
        .tempfile_in(work_dir)?;
    let mut file = tokio::fs::File::from_std(temp.as_file().try_clone()?);

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        reporter.downloading(label, downloaded, total_size);
    }

    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    Ok(DownloadedArchive {
        file: temp,
        size: downloaded,
    })
}
