//! Install pipeline orchestration.
//!
//! One [`Installer::run`] resolves the current release, compares it with the
//! install record, fetches and parses the manifest, then downloads and
//! unpacks each archive in manifest order. Per-archive failures are collected
//! as [`ArchiveOutcome`] values; only failures that leave nothing sensible to
//! do (no release, no manifest, cancellation, directories not creatable,
//! root locked) end the run with an [`InstallError`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::InstallerConfig;
use crate::destinations::DestinationMap;
use crate::io::download::download_archive;
use crate::io::extract::extract_zip;
use crate::manifest::{ManifestError, fetch_manifest, parse_manifest};
use crate::reporter::Reporter;
use crate::resolver::resolve_release;
use crate::state::{self, InstallLock, InstallState, StateError};
use crate::types::{ArchiveDescriptor, ReleaseId};

/// Fatal failures of an install run.
#[derive(Error, Debug)]
pub enum InstallError {
    /// The version endpoint gave no usable release identifier.
    #[error("could not resolve the current release")]
    VersionUnavailable,

    /// No mirror served the manifest.
    #[error(transparent)]
    Manifest(ManifestError),

    /// The run was cancelled through its token.
    #[error("install cancelled")]
    Cancelled,

    /// The work directory could not be created.
    #[error("cannot create directory {}: {source}", path.display())]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Lock or state file failure before any archive was touched.
    #[error(transparent)]
    State(#[from] StateError),
}

impl From<ManifestError> for InstallError {
    fn from(err: ManifestError) -> Self {
        if matches!(err, ManifestError::Cancelled) {
            Self::Cancelled
        } else {
            Self::Manifest(err)
        }
    }
}

/// Result of one archive in the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Downloaded and unpacked.
    Installed {
        /// Archive filename.
        filename: String,
        /// Directory it was unpacked into.
        destination: PathBuf,
        /// Files written.
        files: usize,
        /// Entries rejected by the traversal guard.
        skipped: Vec<String>,
    },
    /// Abandoned; the loop moved on.
    Failed {
        /// Archive filename.
        filename: String,
        /// Human-readable reason.
        reason: String,
    },
}

impl ArchiveOutcome {
    /// Archive filename.
    pub fn filename(&self) -> &str {
        match self {
            Self::Installed { filename, .. } | Self::Failed { filename, .. } => filename,
        }
    }

    /// True for [`ArchiveOutcome::Installed`].
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed { .. })
    }
}

/// Classification of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallStatus {
    /// Every archive installed and the install record was written.
    Complete,
    /// Some archives failed; the install record was not written.
    Partial {
        /// Filenames of the failed archives.
        failed: Vec<String>,
    },
    /// Every archive installed, but the settings or version file could not be written.
    Unrecorded,
    /// No archive installed.
    Failed,
    /// The manifest listed no archives.
    NothingToInstall,
}

impl InstallStatus {
    /// True only for [`InstallStatus::Complete`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Accumulated result of a full install run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Release that was installed.
    pub release: ReleaseId,
    /// Mirror that served the manifest and every archive.
    pub mirror: String,
    /// One outcome per listed archive, in manifest order.
    pub archives: Vec<ArchiveOutcome>,
    /// Whether the settings sentinel was written.
    pub settings_written: bool,
    /// Whether the version file was written.
    pub version_recorded: bool,
}

impl InstallReport {
    /// Number of archives that installed.
    pub fn installed_count(&self) -> usize {
        self.archives.iter().filter(|a| a.is_installed()).count()
    }

    /// Filenames of failed archives, in manifest order.
    pub fn failed_archives(&self) -> Vec<String> {
        self.archives
            .iter()
            .filter(|a| !a.is_installed())
            .map(|a| a.filename().to_string())
            .collect()
    }

    /// Classify the run.
    pub fn status(&self) -> InstallStatus {
        if self.archives.is_empty() {
            return InstallStatus::NothingToInstall;
        }
        if self.installed_count() == 0 {
            return InstallStatus::Failed;
        }
        let failed = self.failed_archives();
        if !failed.is_empty() {
            return InstallStatus::Partial { failed };
        }
        if self.version_recorded {
            InstallStatus::Complete
        } else {
            InstallStatus::Unrecorded
        }
    }
}

/// How a run ended when no fatal error occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The recorded install already matches this release; nothing was downloaded.
    UpToDate(ReleaseId),
    /// The archive loop ran.
    Installed(InstallReport),
}

impl InstallOutcome {
    /// True for an up-to-date short-circuit or a complete install.
    pub fn is_success(&self) -> bool {
        match self {
            Self::UpToDate(_) => true,
            Self::Installed(report) => report.status().is_success(),
        }
    }
}

/// Runs the install pipeline for one configuration.
pub struct Installer {
    config: InstallerConfig,
    client: Client,
    reporter: Arc<dyn Reporter>,
    cancel: CancellationToken,
    destinations: DestinationMap,
}

impl fmt::Debug for Installer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Installer")
            .field("install_dir", &self.config.install_dir)
            .field("mirrors", &self.config.mirrors)
            .finish_non_exhaustive()
    }
}

impl Installer {
    /// Create an installer. Destinations come from the config's table.
    pub fn new(config: InstallerConfig, client: Client, reporter: Arc<dyn Reporter>) -> Self {
        let destinations = config.destination_map();
        Self {
            config,
            client,
            reporter,
            cancel: CancellationToken::new(),
            destinations,
        }
    }

    /// Use `token` to cancel runs of this installer.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that cancels this installer's runs.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn install_root(&self) -> &Path {
        &self.config.install_dir
    }

    fn check_cancelled(&self) -> Result<(), InstallError> {
        if self.cancel.is_cancelled() {
            return Err(InstallError::Cancelled);
        }
        Ok(())
    }

    /// Run the pipeline once.
    ///
    /// With `force`, a matching install record does not short-circuit.
    ///
    /// # Errors
    ///
    /// Returns [`InstallError`] when the release or manifest cannot be
    /// obtained, the root cannot be created or is locked, or the run is
    /// cancelled. Archive-level failures are reported in the returned
    /// [`InstallReport`] instead.
    pub async fn run(&self, force: bool) -> Result<InstallOutcome, InstallError> {
        let root = self.install_root().to_path_buf();
        let recorded = InstallState::read(&root);

        self.check_cancelled()?;
        self.reporter.section("Resolving release");
        let Some(release) = resolve_release(
            &self.client,
            &self.config.version_url,
            &self.config.version_field,
        )
        .await
        else {
            self.reporter.error("Failed to fetch latest version");
            return Err(InstallError::VersionUnavailable);
        };
        self.reporter.info(&format!("Latest release: {release}"));

        if let Some(installed) = &recorded.installed {
            self.reporter.info(&format!("Installed release: {installed}"));
        }
        if recorded.is_current(&release) && !force {
            self.reporter
                .success(&format!("{release} is already installed and up to date"));
            return Ok(InstallOutcome::UpToDate(release));
        }
        if recorded.is_incomplete(&release) {
            self.reporter
                .warning("Version matches but AppSettings.xml is missing, reinstalling");
        }

        self.reporter.section("Fetching manifest");
        let manifest = fetch_manifest(
            &self.client,
            &self.config.mirror_bases(),
            &release,
            &self.cancel,
            self.reporter.as_ref(),
        )
        .await?;
        let archives = parse_manifest(&manifest.body, &self.config.archive_extension);

        let mut lock = InstallLock::open(&root)?;
        let _guard = lock.try_acquire()?;
        std::fs::create_dir_all(&self.config.work_dir).map_err(|source| InstallError::CreateDir {
            path: self.config.work_dir.clone(),
            source,
        })?;

        let mut report = InstallReport {
            release,
            mirror: manifest.mirror,
            archives: Vec::with_capacity(archives.len()),
            settings_written: false,
            version_recorded: false,
        };

        if archives.is_empty() {
            warn!(release = %report.release, "manifest lists no archives");
            self.reporter
                .warning("No archives found in the package manifest, nothing to install");
            self.discard_version_record(&root);
            return Ok(InstallOutcome::Installed(report));
        }

        self.reporter
            .section(&format!("Installing {} archives", archives.len()));
        for filename in &archives {
            if self.cancel.is_cancelled() {
                self.discard_version_record(&root);
                return Err(InstallError::Cancelled);
            }
            let descriptor = self.destinations.resolve(filename);
            let outcome = self
                .install_archive(&root, &report.mirror, &report.release, &descriptor)
                .await;
            match outcome {
                Ok(outcome) => report.archives.push(outcome),
                Err(e) => {
                    self.discard_version_record(&root);
                    return Err(e);
                }
            }
        }

        let installed = report.installed_count();
        if installed == 0 {
            error!(release = %report.release, "no archive installed");
            self.reporter.error("No archives were installed");
        }

        match state::write_settings(&root) {
            Ok(()) => report.settings_written = true,
            Err(e) => {
                error!(error = %e, "failed to write settings sentinel");
                self.reporter.error(&format!("Could not write AppSettings.xml: {e}"));
            }
        }

        if state::should_record(installed, archives.len(), report.settings_written) {
            match state::write_version(&root, &report.release) {
                Ok(()) => report.version_recorded = true,
                Err(e) => {
                    error!(error = %e, "failed to write version file");
                    self.reporter.error(&format!("Could not record installed version: {e}"));
                }
            }
        } else {
            self.discard_version_record(&root);
        }

        self.reporter.summary(installed, archives.len());
        info!(
            release = %report.release,
            installed,
            total = archives.len(),
            "install run finished"
        );
        Ok(InstallOutcome::Installed(report))
    }

    /// Download and unpack one archive.
    ///
    /// Only cancellation escapes as an error; everything else becomes
    /// [`ArchiveOutcome::Failed`].
    async fn install_archive(
        &self,
        root: &Path,
        mirror: &str,
        release: &ReleaseId,
        descriptor: &ArchiveDescriptor,
    ) -> Result<ArchiveOutcome, InstallError> {
        let filename = descriptor.filename.clone();
        let destination = descriptor.destination(root);

        if !descriptor.has_plain_name() {
            return Ok(self.fail(filename, "archive name is not a plain file name".to_string()));
        }

        if !descriptor.mapped {
            self.reporter.warning(&format!(
                "No destination mapping for {filename}, extracting to install root"
            ));
        }

        if let Err(e) = std::fs::create_dir_all(&destination) {
            return Ok(self.fail(
                filename,
                format!("cannot create {}: {e}", destination.display()),
            ));
        }

        let url = descriptor.url(mirror, release);
        let download = download_archive(
            &self.client,
            &url,
            &self.config.work_dir,
            &filename,
            self.config.download_timeout(),
            self.reporter.as_ref(),
        );
        let result = tokio::select! {
            () = self.cancel.cancelled() => None,
            result = download => Some(result),
        };
        let downloaded = match result {
            None => return Err(InstallError::Cancelled),
            Some(Ok(downloaded)) => downloaded,
            Some(Err(e)) => return Ok(self.fail(filename, e.to_string())),
        };
        debug!(archive = %filename, bytes = downloaded.size, "archive downloaded");

        let reporter = Arc::clone(&self.reporter);
        let label = filename.clone();
        let dest = destination.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let result = extract_zip(downloaded.path(), &dest, |current, total| {
                reporter.extracting(&label, current, Some(total));
            });
            (downloaded, result)
        })
        .await;

        let (downloaded, extracted) = match joined {
            Ok(pair) => pair,
            Err(e) => return Ok(self.fail(filename, format!("extraction task failed: {e}"))),
        };
        if let Err(e) = downloaded.remove() {
            warn!(archive = %filename, error = %e, "could not remove temporary archive");
        }

        match extracted {
            Ok(summary) => {
                if !summary.skipped.is_empty() {
                    self.reporter.warning(&format!(
                        "{filename}: skipped {} unsafe entries",
                        summary.skipped.len()
                    ));
                }
                self.reporter
                    .archive_done(&filename, &format!("{} files", summary.files));
                Ok(ArchiveOutcome::Installed {
                    filename,
                    destination,
                    files: summary.files,
                    skipped: summary.skipped,
                })
            }
            Err(e) => Ok(self.fail(filename, e.to_string())),
        }
    }

    fn fail(&self, filename: String, reason: String) -> ArchiveOutcome {
        warn!(archive = %filename, %reason, "archive failed");
        self.reporter.archive_failed(&filename, &reason);
        ArchiveOutcome::Failed { filename, reason }
    }

    fn discard_version_record(&self, root: &Path) {
        match state::clear_version(root) {
            Ok(true) => self
                .reporter
                .info("Removed outdated version file after incomplete install"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "could not remove stale version file"),
        }
    }
}
