//! obl-core - release resolution and install pipeline for OpenBloxLoader.
//!
//! The CDN that hosts the player has no single manifest endpoint. Installing
//! means: ask the client-settings service for the current release, try each
//! setup mirror for that release's package manifest, then download and unpack
//! every archive it lists into a fixed directory layout.
//!
//! # Pipeline
//!
//! ```text
//! resolver ─▶ manifest (fetch + parse) ─▶ install loop ─▶ state ─▶ locator
//! ```
//!
//! All status lines go through the [`Reporter`] sink; nothing in this crate
//! writes to stdout.
#![allow(clippy::doc_markdown)]

pub mod config;
pub mod destinations;
pub mod install;
pub mod io;
pub mod locator;
pub mod manifest;
pub mod paths;
pub mod resolver;
pub mod state;
pub mod types;

pub mod reporter;

pub use config::InstallerConfig;
pub use install::{InstallError, InstallOutcome, InstallReport, InstallStatus, Installer};
pub use reporter::{ChannelReporter, NullReporter, Reporter, StatusEvent};
pub use types::{ArchiveDescriptor, ReleaseId};

/// User Agent string for core operations
pub const USER_AGENT: &str = concat!("obl-core/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client used by every pipeline stage.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn http_client(config: &InstallerConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.timeout())
        .build()
}
