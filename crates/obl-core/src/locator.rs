//! Find the launchable executable inside an install root.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Why no executable could be located.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LocateError {
    /// The install root does not exist or is not a directory.
    #[error("install root {} does not exist", .0.display())]
    RootMissing(PathBuf),

    /// The walk finished without a match.
    #[error("no file ending in '{suffix}' containing '{name}' under {}", root.display())]
    NotFound {
        /// Install root that was searched.
        root: PathBuf,
        /// Required suffix.
        suffix: String,
        /// Required name substring.
        name: String,
    },
}

/// Whether `file_name` ends with `suffix` and contains `name`, ignoring case.
pub fn matches_executable(file_name: &str, suffix: &str, name: &str) -> bool {
    let lower = file_name.to_lowercase();
    lower.ends_with(&suffix.to_lowercase()) && lower.contains(&name.to_lowercase())
}

/// Walk `root` in file-name order and return the first matching file.
///
/// Unreadable entries are logged and skipped. The walk stops at the first
/// match.
///
/// # Errors
///
/// Returns [`LocateError::RootMissing`] if `root` is not a directory, or
/// [`LocateError::NotFound`] after a full walk without a match.
pub fn find_executable(root: &Path, suffix: &str, name: &str) -> Result<PathBuf, LocateError> {
    if !root.is_dir() {
        return Err(LocateError::RootMissing(root.to_path_buf()));
    }

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if matches_executable(&entry.file_name().to_string_lossy(), suffix, name) {
            debug!(path = %entry.path().display(), "found executable");
            return Ok(entry.into_path());
        }
    }

    Err(LocateError::NotFound {
        root: root.to_path_buf(),
        suffix: suffix.to_string(),
        name: name.to_string(),
    })
}
