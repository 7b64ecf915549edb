//! `obl status`: what is installed, and optionally whether it is current.

use std::process::ExitCode;
use std::time::SystemTime;

use anyhow::{Context, Result};
use crossterm::style::Stylize;
use obl_core::resolver::resolve_release;
use obl_core::state::{self, InstallState};
use obl_core::{InstallerConfig, http_client};

use crate::cmd::launch::locate;

fn format_time(t: SystemTime) -> String {
    chrono::DateTime::<chrono::Local>::from(t)
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// `obl status`
pub async fn status(config: &InstallerConfig, check: bool) -> Result<ExitCode> {
    let root = &config.install_dir;
    let recorded = InstallState::read(root);
    let label_width = 12;

    println!();
    println!("{}", "Install status".dark_grey());
    println!();

    println!(
        "{:<width$}{}",
        "Root:",
        root.display(),
        width = label_width
    );

    let version = match &recorded.installed {
        Some(release) => {
            let when = state::version_recorded_at(root)
                .map_or_else(|| "unknown".to_string(), format_time);
            format!("{release} (recorded {when})")
        }
        None => "not installed".to_string(),
    };
    println!("{:<width$}{}", "Version:", version, width = label_width);

    println!(
        "{:<width$}{}",
        "Settings:",
        if recorded.settings_present {
            "present"
        } else {
            "missing"
        },
        width = label_width
    );

    let exe = match locate(config).await {
        Ok(path) => path.display().to_string(),
        Err(_) => "not found".to_string(),
    };
    println!("{:<width$}{}", "Player:", exe, width = label_width);

    if check {
        let client = http_client(config).context("Failed to build HTTP client")?;
        println!();
        match resolve_release(&client, &config.version_url, &config.version_field).await {
            Some(latest) if recorded.is_current(&latest) => {
                println!("{}", format!("Up to date ({latest})").green());
            }
            Some(latest) if recorded.is_incomplete(&latest) => {
                println!("{}", format!("Install of {latest} is incomplete").yellow());
            }
            Some(latest) => {
                println!("{}", format!("Update available: {latest}").yellow());
            }
            None => {
                eprintln!("{}", "Could not reach the version endpoint".red());
            }
        }
    }

    println!();
    Ok(ExitCode::SUCCESS)
}
