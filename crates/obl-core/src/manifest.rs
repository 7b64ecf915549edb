//! Package manifest fetch and parse.
//!
//! A manifest lives at `<mirror><release>-rbxPkgManifest.txt` and is a flat
//! list of lines in records of four:
//!
//! ```text
//! v0
//! RobloxApp.zip            <- index 1 of each record: archive filename
//! 0a1b2c3d...              <- checksum (unused)
//! 12345678                 <- size (unused)
//! ...
//! ```
//!
//! Record boundaries are positional. The parser walks a fixed stride and does
//! not try to re-synchronise on malformed input; a missing line shifts every
//! later record, which is the behaviour of the service's own bootstrapper.

use reqwest::Client;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::Reporter;
use crate::types::ReleaseId;

/// Lines per manifest record.
pub const RECORD_STRIDE: usize = 4;

/// Offset of the filename inside a record.
pub const FILENAME_OFFSET: usize = 1;

/// Suffix appended to `<mirror><release>` to locate the manifest.
pub const MANIFEST_SUFFIX: &str = "-rbxPkgManifest.txt";

/// No mirror produced a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Every mirror failed; `attempts` lists `(mirror, reason)` in order.
    #[error("no mirror served the manifest for {release} ({} tried)", attempts.len())]
    Unavailable {
        /// Release whose manifest was requested.
        release: ReleaseId,
        /// Per-mirror failure reasons.
        attempts: Vec<(String, String)>,
    },

    /// Cancelled between mirror attempts.
    #[error("manifest fetch cancelled")]
    Cancelled,
}

/// A manifest body together with the mirror that served it.
///
/// The mirror is pinned for every archive download in the same run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedManifest {
    /// Base URL of the mirror that answered.
    pub mirror: String,
    /// Raw manifest text.
    pub body: String,
}

/// Manifest URL for `release` on `mirror`.
pub fn manifest_url(mirror: &str, release: &ReleaseId) -> String {
    format!("{mirror}{release}{MANIFEST_SUFFIX}")
}

/// Try each mirror in order until one returns a manifest body.
///
/// Transport errors, timeouts, non-success statuses and body read errors all
/// move on to the next mirror.
///
/// # Errors
///
/// Returns [`ManifestError::Unavailable`] when the list is exhausted, or
/// [`ManifestError::Cancelled`] if `cancel` fires between attempts.
pub async fn fetch_manifest(
    client: &Client,
    mirrors: &[String],
    release: &ReleaseId,
    cancel: &CancellationToken,
    reporter: &dyn Reporter,
) -> Result<FetchedManifest, ManifestError> {
    let mut attempts = Vec::with_capacity(mirrors.len());

    for mirror in mirrors {
        if cancel.is_cancelled() {
            return Err(ManifestError::Cancelled);
        }

        let url = manifest_url(mirror, release);
        debug!(%url, "trying manifest");

        match try_mirror(client, &url).await {
            Ok(body) => {
                info!(mirror = %mirror, "fetched manifest");
                reporter.info(&format!("Fetched manifest from {mirror}"));
                return Ok(FetchedManifest {
                    mirror: mirror.clone(),
                    body,
                });
            }
            Err(reason) => {
                warn!(mirror = %mirror, %reason, "manifest fetch failed, trying next mirror");
                reporter.warning(&format!("Mirror {mirror} failed: {reason}"));
                attempts.push((mirror.clone(), reason));
            }
        }
    }

    Err(ManifestError::Unavailable {
        release: release.clone(),
        attempts,
    })
}

async fn try_mirror(client: &Client, url: &str) -> Result<String, String> {
    let response = client.get(url).send().await.map_err(|e| e.to_string())?;
    let status = response.status();
    if !status.is_success() {
        return Err(format!("HTTP {status}"));
    }
    response.text().await.map_err(|e| e.to_string())
}

/// Extract archive filenames from a manifest body.
///
/// Lines are split on `\n` with trailing whitespace removed; a single empty
/// trailing line is discarded. The walk starts at index 1 and advances by
/// four. Only names ending in `extension` (case-insensitive) are kept, in
/// manifest order.
pub fn parse_manifest(body: &str, extension: &str) -> Vec<String> {
    let mut lines: Vec<&str> = body.split('\n').map(str::trim_end).collect();
    if lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    let extension = extension.to_lowercase();
    let mut archives = Vec::new();

    for line in lines.iter().skip(FILENAME_OFFSET).step_by(RECORD_STRIDE) {
        let name = line.trim();
        if name.to_lowercase().ends_with(&extension) {
            archives.push(name.to_string());
        } else {
            debug!(entry = name, "skipping non-archive manifest entry");
        }
    }

    archives
}
