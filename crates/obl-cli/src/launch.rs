//! Process launch for a located executable.
//!
//! Spawns the player with its own directory as the working directory, then
//! detaches, waits, or waits with a deadline.

use std::path::Path;
use std::process::{Command, ExitStatus};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};
use wait_timeout::ChildExt;

use crate::LaunchArgs;

/// How long to stay attached to the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    /// Return right after spawning.
    Detach,
    /// Block until the child exits.
    Wait,
    /// Block until the child exits or the duration passes.
    WaitFor(Duration),
}

impl From<&LaunchArgs> for WaitMode {
    fn from(args: &LaunchArgs) -> Self {
        if args.no_wait {
            Self::Detach
        } else if let Some(secs) = args.wait_timeout {
            Self::WaitFor(Duration::from_secs(secs))
        } else {
            Self::Wait
        }
    }
}

/// What happened to the child.
#[derive(Debug)]
pub enum LaunchOutcome {
    /// Spawned and left running.
    Detached {
        /// Child process id.
        pid: u32,
    },
    /// The child exited while we waited.
    Exited(ExitStatus),
    /// The wait deadline passed; the child is still running.
    StillRunning {
        /// Child process id.
        pid: u32,
    },
}

impl LaunchOutcome {
    /// Exit code for `obl` itself: the child's code when it exited, else 0.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Detached { .. } | Self::StillRunning { .. } => 0,
            Self::Exited(status) if status.success() => 0,
            Self::Exited(status) => status
                .code()
                .and_then(|c| u8::try_from(c).ok())
                .filter(|c| *c != 0)
                .unwrap_or(1),
        }
    }
}

/// Spawn `exe` with `args` and wait according to `mode`.
pub fn run(exe: &Path, args: &[String], mode: WaitMode) -> Result<LaunchOutcome> {
    let mut command = Command::new(exe);
    command.args(args);
    if let Some(dir) = exe.parent() {
        command.current_dir(dir);
    }

    let mut child = command
        .spawn()
        .with_context(|| format!("Failed to start {}", exe.display()))?;
    let pid = child.id();
    info!(pid, path = %exe.display(), "started player");

    match mode {
        WaitMode::Detach => Ok(LaunchOutcome::Detached { pid }),
        WaitMode::Wait => {
            let status = child.wait().context("Failed to wait for player")?;
            debug!(pid, %status, "player exited");
            Ok(LaunchOutcome::Exited(status))
        }
        WaitMode::WaitFor(timeout) => {
            match child
                .wait_timeout(timeout)
                .context("Failed to wait for player")?
            {
                Some(status) => Ok(LaunchOutcome::Exited(status)),
                None => Ok(LaunchOutcome::StillRunning { pid }),
            }
        }
    }
}
