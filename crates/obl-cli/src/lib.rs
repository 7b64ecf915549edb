//! obl - OpenBloxLoader command line
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Installs the Roblox player straight from its setup mirrors and launches it.
//!
//! # Commands
//!
//! ```text
//! obl install [--force]          resolve, download, unpack, record
//! obl launch  [--no-wait] [-- ARGS]
//! obl play                       install, then launch
//! obl status  [--check]
//! ```
//!
//! The install pipeline lives in `obl-core`; this crate parses arguments,
//! sets up logging, renders status events and owns the process launch.

pub mod cmd;
pub mod launch;
pub mod logging;
pub mod ui;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "obl")]
#[command(author, version, about = "obl - install and launch the Roblox player from its CDN")]
pub struct Cli {
    /// Config file (default: $OBL_CONFIG, then ./obl.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Install root, overriding the config file
    #[arg(long, global = true, env = "OBL_INSTALL_DIR", value_name = "DIR")]
    pub install_dir: Option<PathBuf>,

    /// Append diagnostic logs to this file instead of stderr
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Debug-level diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Install or update to the current release
    Install {
        /// Reinstall even if the recorded release is current
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Start the installed player
    Launch {
        #[command(flatten)]
        launch: LaunchArgs,
    },
    /// Install if needed, then launch
    Play {
        /// Reinstall even if the recorded release is current
        #[arg(long, short = 'f')]
        force: bool,
        #[command(flatten)]
        launch: LaunchArgs,
    },
    /// Show what is installed
    Status {
        /// Also ask the version endpoint for the latest release
        #[arg(long)]
        check: bool,
    },
}

#[derive(Debug, Clone, Args)]
pub struct LaunchArgs {
    /// Return as soon as the player has started
    #[arg(long)]
    pub no_wait: bool,

    /// Stop waiting after this many seconds (the player keeps running)
    #[arg(long, value_name = "SECS", conflicts_with = "no_wait")]
    pub wait_timeout: Option<u64>,

    /// Arguments passed to the player
    #[arg(last = true)]
    pub args: Vec<String>,
}
