//! Filesystem layout of an install root.

use std::path::{Path, PathBuf};

/// Default install root, relative to the working directory.
pub const DEFAULT_INSTALL_DIR: &str = "RobloxPlayer";

/// Persisted release identifier of the last complete install.
pub const VERSION_FILE: &str = "installed_version.txt";

/// Settings document written after the archive loop; doubles as the
/// "install finished" sentinel.
pub const SETTINGS_FILE: &str = "AppSettings.xml";

/// Marker held while an install run owns the install root.
pub const LOCK_FILE: &str = ".obl-install.lock";

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "obl.toml";

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "OBL_CONFIG";

/// Version file path: <root>/installed_version.txt
pub fn version_file(install_root: &Path) -> PathBuf {
    install_root.join(VERSION_FILE)
}

/// Settings sentinel path: <root>/AppSettings.xml
pub fn settings_file(install_root: &Path) -> PathBuf {
    install_root.join(SETTINGS_FILE)
}

/// Install lock path: <root>/.obl-install.lock
pub fn lock_file(install_root: &Path) -> PathBuf {
    install_root.join(LOCK_FILE)
}

/// Resolve which config file to load, if any.
///
/// An explicit path wins, then `$OBL_CONFIG`, then `obl.toml` in the working
/// directory when it exists.
pub fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(val) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(val));
    }
    let local = PathBuf::from(CONFIG_FILE);
    local.exists().then_some(local)
}

