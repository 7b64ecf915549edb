//! Current-release lookup against the client-settings service.

use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::types::ReleaseId;

/// Why the version endpoint did not yield a release.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// Transport failure or non-success status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Body was not a JSON object.
    #[error("Invalid JSON from version endpoint: {0}")]
    Json(#[from] serde_json::Error),

    /// The expected field is absent or not a string.
    #[error("Field '{0}' missing from version response")]
    MissingField(String),

    /// The field is present but blank.
    #[error("Field '{0}' is empty")]
    EmptyField(String),
}

/// Fetch the current release identifier, with the failure reason.
///
/// One GET, no retries.
///
/// # Errors
///
/// Returns a [`ResolveError`] for transport, status, decode, or field errors.
pub async fn fetch_release(
    client: &Client,
    url: &str,
    field: &str,
) -> Result<ReleaseId, ResolveError> {
    let body = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let json: serde_json::Value = serde_json::from_str(&body)?;
    let raw = json
        .get(field)
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| ResolveError::MissingField(field.to_string()))?;

    let release = ReleaseId::new(raw).ok_or_else(|| ResolveError::EmptyField(field.to_string()))?;
    debug!(%release, url, "resolved release");
    Ok(release)
}

/// Resolve the current release identifier.
///
/// `None` is the "resolution failed" sentinel: any network, status, or decode
/// failure is logged and collapsed into it. Callers abort the dependent
/// pipeline on `None`.
pub async fn resolve_release(client: &Client, url: &str, field: &str) -> Option<ReleaseId> {
    match fetch_release(client, url, field).await {
        Ok(release) => Some(release),
        Err(e) => {
            warn!(url, error = %e, "failed to resolve current release");
            None
        }
    }
}
