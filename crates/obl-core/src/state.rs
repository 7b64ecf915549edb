//! Install record: the persisted version file, the settings sentinel, and the
//! single in-flight install lock.
//!
//! A release counts as installed only when the version file matches it and
//! `AppSettings.xml` exists. Version match with a missing sentinel is a
//! half-finished install and gets reinstalled.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use fd_lock::{RwLock, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::paths;
use crate::types::ReleaseId;

/// Fixed content of the settings sentinel.
pub const SETTINGS_XML: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>
<Settings>
\t<ContentFolder>content</ContentFolder>
\t<BaseUrl>http://www.roblox.com</BaseUrl>
</Settings>";

/// Failure reading or writing install-record files.
#[derive(Error, Debug)]
pub enum StateError {
    /// Filesystem operation on a state file failed.
    #[error("IO error at {}: {source}", path.display())]
    Io {
        /// State file involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Another install run holds the lock.
    #[error("another install is running against this root (lock {} is held)", path.display())]
    Locked {
        /// Lock file path.
        path: PathBuf,
    },
}

impl StateError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Snapshot of the install record under one root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallState {
    /// Trimmed contents of the version file, if it exists and is not blank.
    pub installed: Option<ReleaseId>,
    /// Whether the settings sentinel exists.
    pub settings_present: bool,
}

impl InstallState {
    /// Read the record under `install_root`.
    ///
    /// A missing root or missing files read as "nothing installed". An
    /// unreadable version file is logged and treated the same way, so the
    /// caller proceeds with a full install.
    pub fn read(install_root: &Path) -> Self {
        let version_path = paths::version_file(install_root);
        let installed = match fs::read_to_string(&version_path) {
            Ok(content) => ReleaseId::new(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %version_path.display(), error = %e, "cannot read version file");
                None
            }
        };

        Self {
            installed,
            settings_present: paths::settings_file(install_root).is_file(),
        }
    }

    /// True when `latest` is recorded and the sentinel is present.
    pub fn is_current(&self, latest: &ReleaseId) -> bool {
        self.installed.as_ref() == Some(latest) && self.settings_present
    }

    /// Recorded version matches `latest` but the sentinel is gone.
    pub fn is_incomplete(&self, latest: &ReleaseId) -> bool {
        self.installed.as_ref() == Some(latest) && !self.settings_present
    }
}

/// Whether a finished run may write the version file.
///
/// Every listed archive must have installed, at least one must have been
/// listed, and the settings sentinel must have been written.
pub fn should_record(installed: usize, listed: usize, settings_written: bool) -> bool {
    listed > 0 && installed == listed && settings_written
}

/// Write the settings sentinel, replacing any existing file.
///
/// # Errors
///
/// Returns [`StateError::Io`] if the file cannot be created, written, or
/// synced.
pub fn write_settings(install_root: &Path) -> Result<(), StateError> {
    let path = paths::settings_file(install_root);
    write_synced(&path, SETTINGS_XML.as_bytes())?;
    debug!(path = %path.display(), "wrote settings sentinel");
    Ok(())
}

/// Persist `release` as the installed version.
///
/// # Errors
///
/// Returns [`StateError::Io`] if the file cannot be written.
pub fn write_version(install_root: &Path, release: &ReleaseId) -> Result<(), StateError> {
    let path = paths::version_file(install_root);
    write_synced(&path, release.as_str().as_bytes())?;
    info!(%release, path = %path.display(), "recorded installed version");
    Ok(())
}

/// Remove the version file. Returns whether a file was removed.
///
/// # Errors
///
/// Returns [`StateError::Io`] for failures other than the file being absent.
pub fn clear_version(install_root: &Path) -> Result<bool, StateError> {
    let path = paths::version_file(install_root);
    match fs::remove_file(&path) {
        Ok(()) => {
            info!(path = %path.display(), "removed stale version file");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StateError::io(&path, e)),
    }
}

/// Modification time of the version file, if present.
pub fn version_recorded_at(install_root: &Path) -> Option<SystemTime> {
    fs::metadata(paths::version_file(install_root))
        .and_then(|m| m.modified())
        .ok()
}

fn write_synced(path: &Path, content: &[u8]) -> Result<(), StateError> {
    let mut file = fs::File::create(path).map_err(|e| StateError::io(path, e))?;
    file.write_all(content).map_err(|e| StateError::io(path, e))?;
    file.sync_all().map_err(|e| StateError::io(path, e))
}

/// Advisory lock serialising install runs against one root.
///
/// Backed by an OS file lock on `<root>/.obl-install.lock`, so the kernel
/// releases it when the holding process exits, however it exits. The file
/// itself stays behind and carries the pid of the last holder.
pub struct InstallLock {
    path: PathBuf,
    file: RwLock<File>,
}

impl fmt::Debug for InstallLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallLock")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Held install lock; released on drop.
pub struct InstallGuard<'a> {
    _guard: RwLockWriteGuard<'a, File>,
}

impl fmt::Debug for InstallGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallGuard").finish_non_exhaustive()
    }
}

impl InstallLock {
    /// Open the lock file for `install_root`, creating the root if needed.
    ///
    /// Opening does not lock; see [`InstallLock::try_acquire`].
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] if the root or the lock file cannot be
    /// created.
    pub fn open(install_root: &Path) -> Result<Self, StateError> {
        fs::create_dir_all(install_root).map_err(|e| StateError::io(install_root, e))?;

        let path = paths::lock_file(install_root);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| StateError::io(&path, e))?;
        Ok(Self {
            path,
            file: RwLock::new(file),
        })
    }

    /// Take the lock without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Locked`] if another handle holds it, or
    /// [`StateError::Io`] if locking or recording the pid fails.
    pub fn try_acquire(&mut self) -> Result<InstallGuard<'_>, StateError> {
        let mut guard = match self.file.try_write() {
            Ok(guard) => guard,
            Err(e) if is_contended(&e) => {
                return Err(StateError::Locked {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(StateError::io(&self.path, e)),
        };

        record_owner(&mut guard).map_err(|e| StateError::io(&self.path, e))?;
        debug!(path = %self.path.display(), "acquired install lock");
        Ok(InstallGuard { _guard: guard })
    }
}

fn record_owner(file: &mut File) -> io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    writeln!(file, "{}", std::process::id())?;
    file.flush()
}

fn is_contended(e: &io::Error) -> bool {
    // ERROR_LOCK_VIOLATION
    e.kind() == io::ErrorKind::WouldBlock || (cfg!(windows) && e.raw_os_error() == Some(33))
}
