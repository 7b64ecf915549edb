//! Installer configuration.
//!
//! Every field has a default that matches the live service, so an absent
//! `obl.toml` is a valid configuration. A file only needs the keys it changes:
//!
//! ```toml
//! install_dir = "/opt/roblox"
//! mirrors = ["https://setup.rbxcdn.com/"]
//!
//! [destinations]
//! "content-new.zip" = "content/new"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::destinations::DestinationMap;
use crate::paths::DEFAULT_INSTALL_DIR;

/// Client-settings endpoint that reports the live release.
pub const DEFAULT_VERSION_URL: &str =
    "https://clientsettingscdn.roblox.com/v2/client-version/WindowsPlayer/channel/live/";

/// JSON field holding the release identifier.
pub const DEFAULT_VERSION_FIELD: &str = "clientVersionUpload";

/// Setup mirrors, tried in this order.
pub const DEFAULT_MIRRORS: &[&str] = &[
    "https://setup.rbxcdn.com/",
    "https://setup-aws.rbxcdn.com/",
    "https://setup-ak.rbxcdn.com/",
    "https://roblox-setup.cachefly.net/",
    "https://s3.amazonaws.com/setup.roblox.com/",
];

/// Errors found while validating a loaded configuration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// No mirrors left to try.
    #[error("mirror list is empty")]
    NoMirrors,

    /// A URL that must be http(s) is not.
    #[error("invalid URL for {field}: {value}")]
    InvalidUrl {
        /// Config key holding the URL.
        field: &'static str,
        /// The offending value.
        value: String,
    },

    /// A required string field is blank.
    #[error("empty field: {0}")]
    EmptyField(&'static str),

    /// A timeout of zero would fail every request immediately.
    #[error("{0} must be at least 1 second")]
    ZeroTimeout(&'static str),
}

/// Settings for one installer instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InstallerConfig {
    /// Endpoint returning the current release as JSON.
    pub version_url: String,
    /// JSON field in the version response that carries the release identifier.
    pub version_field: String,
    /// Mirror base URLs, each ending in `/`.
    pub mirrors: Vec<String>,
    /// Root directory the archives unpack into.
    pub install_dir: PathBuf,
    /// Directory for temporary archive downloads.
    pub work_dir: PathBuf,
    /// Timeout for metadata requests (version, manifest), in seconds.
    pub timeout_secs: u64,
    /// Timeout for a single archive download, in seconds.
    pub download_timeout_secs: u64,
    /// Manifest entries are kept only if they end with this (case-insensitive).
    pub archive_extension: String,
    /// Suffix the launcher executable must end with (case-insensitive).
    pub executable_suffix: String,
    /// Substring the launcher executable name must contain (case-insensitive).
    pub executable_name: String,
    /// Extra or replacement rows for the destination table.
    pub destinations: BTreeMap<String, String>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            version_url: DEFAULT_VERSION_URL.to_string(),
            version_field: DEFAULT_VERSION_FIELD.to_string(),
            mirrors: DEFAULT_MIRRORS.iter().map(|m| (*m).to_string()).collect(),
            install_dir: PathBuf::from(DEFAULT_INSTALL_DIR),
            work_dir: PathBuf::from("."),
            timeout_secs: 30,
            download_timeout_secs: 300,
            archive_extension: ".zip".to_string(),
            executable_suffix: ".exe".to_string(),
            executable_name: "robloxplayer".to_string(),
            destinations: BTreeMap::new(),
        }
    }
}

impl InstallerConfig {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// fails [`InstallerConfig::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Load `path` if given, otherwise fall back to defaults.
    ///
    /// # Errors
    ///
    /// Same as [`InstallerConfig::load`] when a path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Check invariants the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.version_url.starts_with("http") {
            return Err(ConfigError::InvalidUrl {
                field: "version_url",
                value: self.version_url.clone(),
            });
        }
        if self.version_field.trim().is_empty() {
            return Err(ConfigError::EmptyField("version_field"));
        }
        if self.mirrors.is_empty() {
            return Err(ConfigError::NoMirrors);
        }
        if let Some(bad) = self.mirrors.iter().find(|m| !m.starts_with("http")) {
            return Err(ConfigError::InvalidUrl {
                field: "mirrors",
                value: bad.clone(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("timeout_secs"));
        }
        if self.download_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("download_timeout_secs"));
        }
        if self.archive_extension.is_empty() {
            return Err(ConfigError::EmptyField("archive_extension"));
        }
        if self.executable_name.is_empty() {
            return Err(ConfigError::EmptyField("executable_name"));
        }
        Ok(())
    }

    /// Mirrors with a guaranteed trailing `/`, since URLs are built by concatenation.
    pub fn mirror_bases(&self) -> Vec<String> {
        self.mirrors
            .iter()
            .map(|m| {
                if m.ends_with('/') {
                    m.clone()
                } else {
                    format!("{m}/")
                }
            })
            .collect()
    }

    /// Built-in destination table with this config's overrides applied.
    pub fn destination_map(&self) -> DestinationMap {
        DestinationMap::builtin().with_overrides(self.destinations.clone())
    }

    /// Metadata request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Per-archive download timeout.
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Set the install root.
    pub fn with_install_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.install_dir = path.into();
        self
    }

    /// Set the temporary download directory.
    pub fn with_work_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.work_dir = path.into();
        self
    }

    /// Replace the mirror list.
    pub fn with_mirrors<I, S>(mut self, mirrors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mirrors = mirrors.into_iter().map(Into::into).collect();
        self
    }

    /// Set the version endpoint.
    pub fn with_version_url(mut self, url: impl Into<String>) -> Self {
        self.version_url = url.into();
        self
    }

    /// Set both request timeouts, in whole seconds.
    pub fn with_timeouts(mut self, metadata_secs: u64, download_secs: u64) -> Self {
        self.timeout_secs = metadata_secs;
        self.download_timeout_secs = download_secs;
        self
    }
}
