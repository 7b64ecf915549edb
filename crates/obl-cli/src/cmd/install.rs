//! `obl install`

use std::process::ExitCode;

use anyhow::{Context, Result};
use obl_core::{InstallOutcome, InstallStatus, Installer, InstallerConfig, http_client};
use tracing::debug;

use crate::ui::Console;

/// Exit status for a finished run: 0 when current or complete, 2 otherwise.
pub fn exit_status(outcome: &InstallOutcome) -> u8 {
    if outcome.is_success() { 0 } else { 2 }
}

/// Run the pipeline with console output.
///
/// Ctrl-C cancels the run at the next mirror or archive boundary.
pub async fn run_install(config: InstallerConfig, force: bool) -> Result<InstallOutcome> {
    let client = http_client(&config).context("Failed to build HTTP client")?;
    let (reporter, console) = Console::spawn();
    let installer = Installer::new(config, client, reporter);

    let token = installer.cancellation_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, cancelling install");
            token.cancel();
        }
    });

    let result = installer.run(force).await;
    ctrl_c.abort();
    drop(installer);
    console.finish().await;

    let outcome = result.context("Installation failed")?;
    describe(&outcome);
    Ok(outcome)
}

fn describe(outcome: &InstallOutcome) {
    use crossterm::style::Stylize;

    let InstallOutcome::Installed(report) = outcome else {
        return;
    };
    match report.status() {
        InstallStatus::Complete => {
            println!("{}", format!("Installed {}", report.release).green().bold());
        }
        InstallStatus::Partial { failed } => {
            eprintln!(
                "{}",
                format!(
                    "Installation incomplete, failed archives: {}",
                    failed.join(", ")
                )
                .yellow()
            );
        }
        InstallStatus::Unrecorded => {
            eprintln!(
                "{}",
                "Archives installed but the install record could not be written".yellow()
            );
        }
        InstallStatus::Failed => eprintln!("{}", "No archives were installed".red().bold()),
        InstallStatus::NothingToInstall => {
            eprintln!("{}", "The manifest listed nothing to install".yellow());
        }
    }
}

/// `obl install`
pub async fn install(config: InstallerConfig, force: bool) -> Result<ExitCode> {
    let outcome = run_install(config, force).await?;
    Ok(ExitCode::from(exit_status(&outcome)))
}
