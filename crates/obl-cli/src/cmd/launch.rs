//! `obl launch`

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use crossterm::style::Stylize;
use obl_core::InstallerConfig;
use obl_core::locator::find_executable;

use crate::LaunchArgs;
use crate::launch::{self, LaunchOutcome, WaitMode};

/// Find the player executable under the configured install root.
pub async fn locate(config: &InstallerConfig) -> Result<PathBuf> {
    let root = config.install_dir.clone();
    let suffix = config.executable_suffix.clone();
    let name = config.executable_name.clone();

    tokio::task::spawn_blocking(move || find_executable(&root, &suffix, &name))
        .await
        .context("Executable search task failed")?
        .context("Cannot launch")
}

/// `obl launch`
pub async fn launch(config: &InstallerConfig, args: &LaunchArgs) -> Result<ExitCode> {
    let exe = locate(config).await?;
    println!("{} {}", "Launching".bold(), exe.display());

    let mode = WaitMode::from(args);
    let player_args = args.args.clone();
    let outcome = tokio::task::spawn_blocking(move || launch::run(&exe, &player_args, mode))
        .await
        .context("Launch task failed")??;

    match &outcome {
        LaunchOutcome::Detached { pid } => {
            println!("{}", format!("Player started (pid {pid})").dark_grey());
        }
        LaunchOutcome::StillRunning { pid } => {
            println!(
                "{}",
                format!("Player still running (pid {pid}), no longer waiting").dark_grey()
            );
        }
        LaunchOutcome::Exited(status) if status.success() => {
            println!("{}", "Player exited normally".green());
        }
        LaunchOutcome::Exited(status) => {
            eprintln!("{}", format!("Player exited with {status}").red());
        }
    }

    Ok(ExitCode::from(outcome.exit_code()))
}
