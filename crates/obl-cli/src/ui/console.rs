//! Console renderer for pipeline status events.
//!
//! The core emits [`StatusEvent`]s through a [`ChannelReporter`]. One task owns
//! the receiving half and is the only writer to the terminal, so lines from
//! the pipeline never interleave.

use std::sync::Arc;

use crossterm::style::Stylize;
use obl_core::{ChannelReporter, Reporter, StatusEvent};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::task::JoinHandle;
use tracing::warn;

/// Styling class of a rendered line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Section heading.
    Heading,
    /// Ordinary text.
    Plain,
    /// Progress chatter.
    Muted,
    /// Something finished.
    Good,
    /// Recoverable problem.
    Warn,
    /// Failure.
    Bad,
}

/// Text and tone for `event`, or `None` when it is not printed.
///
/// Byte-level download ticks and per-entry extraction ticks are dropped;
/// only the first download tick of an archive is shown.
pub fn render(event: &StatusEvent) -> Option<(Tone, String)> {
    let tone = match event {
        StatusEvent::Section(_) => Tone::Heading,
        StatusEvent::Downloading { current: 0, .. } => Tone::Muted,
        StatusEvent::Downloading { .. } | StatusEvent::Extracting { .. } => return None,
        StatusEvent::ArchiveDone { .. } | StatusEvent::Success(_) => Tone::Good,
        StatusEvent::Info(_) => Tone::Plain,
        StatusEvent::Warning(_) => Tone::Warn,
        StatusEvent::ArchiveFailed { .. } | StatusEvent::Error(_) => Tone::Bad,
        StatusEvent::Summary { succeeded, total } => {
            if succeeded == total {
                Tone::Good
            } else {
                Tone::Bad
            }
        }
    };

    let text = match event {
        StatusEvent::ArchiveDone { .. } | StatusEvent::ArchiveFailed { .. } => {
            format!("  {event}")
        }
        StatusEvent::Downloading { archive, .. } => format!("  {archive}"),
        _ => event.to_string(),
    };
    Some((tone, text))
}

fn print(tone: Tone, text: &str) {
    match tone {
        Tone::Heading => {
            println!();
            println!("{}", text.bold());
        }
        Tone::Plain => println!("{text}"),
        Tone::Muted => println!("{}", text.dark_grey()),
        Tone::Good => println!("{}", text.green()),
        Tone::Warn => println!("{}", text.yellow()),
        Tone::Bad => eprintln!("{}", text.red().bold()),
    }
}

async fn drain(mut rx: UnboundedReceiver<StatusEvent>) {
    while let Some(event) = rx.recv().await {
        if let Some((tone, text)) = render(&event) {
            print(tone, &text);
        }
    }
}

/// Handle to the render task.
#[derive(Debug)]
pub struct Console {
    handle: JoinHandle<()>,
}

impl Console {
    /// Start the render task and return the reporter that feeds it.
    ///
    /// The task ends once every clone of the reporter has been dropped.
    pub fn spawn() -> (Arc<dyn Reporter>, Self) {
        let (tx, rx) = unbounded_channel();
        let handle = tokio::spawn(drain(rx));
        (Arc::new(ChannelReporter::new(tx)), Self { handle })
    }

    /// Wait until every queued line has been printed.
    ///
    /// Drop all reporter clones first or this never returns.
    pub async fn finish(self) {
        if let Err(e) = self.handle.await {
            warn!(error = %e, "console task failed");
        }
    }
}
