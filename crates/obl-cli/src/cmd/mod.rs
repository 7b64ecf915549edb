//! Subcommand implementations.

pub mod install;
pub mod launch;
pub mod play;
pub mod status;

use std::path::Path;

use anyhow::Result;
use obl_core::InstallerConfig;
use obl_core::paths::config_path;
use tracing::debug;

/// Load the configuration for this invocation.
///
/// `--config`, `$OBL_CONFIG`, then `./obl.toml`, else built-in defaults.
/// `install_dir` overrides whatever the file says.
pub fn load_config(explicit: Option<&Path>, install_dir: Option<&Path>) -> Result<InstallerConfig> {
    let path = config_path(explicit);
    if let Some(p) = &path {
        debug!(path = %p.display(), "loading config");
    }
    let config = InstallerConfig::load_or_default(path.as_deref())?;
    Ok(match install_dir {
        Some(dir) => config.with_install_dir(dir),
        None => config,
    })
}
