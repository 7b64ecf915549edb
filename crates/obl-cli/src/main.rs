//! obl - OpenBloxLoader CLI

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use obl_cli::{Cli, Commands, cmd, logging};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.log_file.as_deref())?;

    let config = cmd::load_config(cli.config.as_deref(), cli.install_dir.as_deref())?;

    match cli.command {
        Commands::Install { force } => cmd::install::install(config, force).await,
        Commands::Launch { launch } => cmd::launch::launch(&config, &launch).await,
        Commands::Play { force, launch } => cmd::play::play(config, force, &launch).await,
        Commands::Status { check } => cmd::status::status(&config, check).await,
    }
}
