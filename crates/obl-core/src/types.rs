//! Shared newtypes for the install pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An opaque release identifier as published by the client-settings service
/// (e.g. `version-0a1b2c3d4e5f6789`).
///
/// Nothing inside the string is interpreted. It is compared for equality,
/// persisted as the installed marker and spliced into mirror URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReleaseId(String);

impl ReleaseId {
    /// Create a release identifier, trimming surrounding whitespace.
    ///
    /// Returns `None` when nothing is left after trimming, since an empty
    /// identifier would produce mirror URLs like `https://host/-Libraries.zip`.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for ReleaseId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ReleaseId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ReleaseId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ReleaseId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// One archive from the manifest together with where it unpacks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDescriptor {
    /// File name exactly as listed in the manifest (e.g. `content-sounds.zip`).
    pub filename: String,
    /// Destination relative to the install root; empty means the root itself.
    pub subpath: String,
    /// False when the destination table had no entry and the root was used.
    pub mapped: bool,
}

impl ArchiveDescriptor {
    /// Absolute destination directory under `install_root`.
    pub fn destination(&self, install_root: &Path) -> PathBuf {
        if self.subpath.is_empty() {
            install_root.to_path_buf()
        } else {
            install_root.join(&self.subpath)
        }
    }

    /// Whether the filename is a single path component.
    ///
    /// Names come from the remote manifest and end up in temp file names and
    /// URLs, so separators, `.` and `..` are refused.
    pub fn has_plain_name(&self) -> bool {
        let name = self.filename.as_str();
        !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0'])
    }

    /// Download URL on the mirror that served the manifest.
    pub fn url(&self, mirror: &str, release: &ReleaseId) -> String {
        format!("{mirror}{release}-{}", self.filename)
    }
}
