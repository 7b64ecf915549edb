//! `obl play`: install if needed, then launch.

use std::process::ExitCode;

use anyhow::Result;
use crossterm::style::Stylize;
use obl_core::InstallerConfig;

use crate::LaunchArgs;
use crate::cmd::{install, launch};

/// `obl play`
///
/// A fatal install error stops here. A partial install still launches
/// whatever is on disk.
pub async fn play(config: InstallerConfig, force: bool, args: &LaunchArgs) -> Result<ExitCode> {
    let outcome = install::run_install(config.clone(), force).await?;
    if !outcome.is_success() {
        eprintln!(
            "{}",
            "Install did not complete, launching the existing files".yellow()
        );
    }
    launch::launch(&config, args).await
}
