//! Reporter trait for dependency injection
//!
//! The pipeline reports human-readable progress through this trait instead
//! of a process-wide writer, so a console, a GUI, or a test can observe the
//! same stream of status lines.

use std::fmt;

use tokio::sync::mpsc::UnboundedSender;

/// Sink for status-line events emitted while the pipeline runs.
pub trait Reporter: Send + Sync {
    /// Indicates a new section or phase has started (e.g. "Resolving", "Installing").
    fn section(&self, title: &str);

    /// Updates the progress of an archive download.
    fn downloading(&self, archive: &str, current: u64, total: Option<u64>);

    /// Updates the progress of an archive extraction (entries written so far).
    fn extracting(&self, archive: &str, current: u64, total: Option<u64>);

    /// Marks an archive as downloaded and unpacked.
    fn archive_done(&self, archive: &str, detail: &str);

    /// Marks an archive as abandoned with a specific reason.
    fn archive_failed(&self, archive: &str, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);

    /// Display the final archive tally of an install run.
    fn summary(&self, succeeded: usize, total: usize);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn downloading(&self, archive: &str, current: u64, total: Option<u64>) {
        (**self).downloading(archive, current, total);
    }
    fn extracting(&self, archive: &str, current: u64, total: Option<u64>) {
        (**self).extracting(archive, current, total);
    }
    fn archive_done(&self, archive: &str, detail: &str) {
        (**self).archive_done(archive, detail);
    }
    fn archive_failed(&self, archive: &str, reason: &str) {
        (**self).archive_failed(archive, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
    fn summary(&self, succeeded: usize, total: usize) {
        (**self).summary(succeeded, total);
    }
}

/// A no-op reporter for silent operations (e.g., status checks, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn downloading(&self, _: &str, _: u64, _: Option<u64>) {}
    fn extracting(&self, _: &str, _: u64, _: Option<u64>) {}
    fn archive_done(&self, _: &str, _: &str) {}
    fn archive_failed(&self, _: &str, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: usize, _: usize) {}
}

/// One status event, as delivered by [`ChannelReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// A new phase started.
    Section(String),
    /// Bytes received for an archive.
    Downloading {
        /// Archive filename.
        archive: String,
        /// Bytes so far.
        current: u64,
        /// Content length, if the server sent one.
        total: Option<u64>,
    },
    /// Entries written for an archive.
    Extracting {
        /// Archive filename.
        archive: String,
        /// Entries so far.
        current: u64,
        /// Entry count of the archive.
        total: Option<u64>,
    },
    /// Archive installed.
    ArchiveDone {
        /// Archive filename.
        archive: String,
        /// Short result text.
        detail: String,
    },
    /// Archive abandoned.
    ArchiveFailed {
        /// Archive filename.
        archive: String,
        /// Why it was abandoned.
        reason: String,
    },
    /// Informational line.
    Info(String),
    /// Success line.
    Success(String),
    /// Warning line.
    Warning(String),
    /// Error line.
    Error(String),
    /// Final archive tally.
    Summary {
        /// Archives installed.
        succeeded: usize,
        /// Archives listed in the manifest.
        total: usize,
    },
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Section(title) => write!(f, "{title}..."),
            Self::Downloading {
                archive,
                current,
                total: Some(total),
            } => write!(f, "Downloading {archive} ({current}/{total} bytes)"),
            Self::Downloading {
                archive,
                current,
                total: None,
            } => write!(f, "Downloading {archive} ({current} bytes)"),
            Self::Extracting {
                archive,
                current,
                total: Some(total),
            } => write!(f, "Extracting {archive} ({current}/{total})"),
            Self::Extracting {
                archive,
                current,
                total: None,
            } => write!(f, "Extracting {archive} ({current})"),
            Self::ArchiveDone { archive, detail } => write!(f, "{archive}: {detail}"),
            Self::ArchiveFailed { archive, reason } => write!(f, "{archive} failed: {reason}"),
            Self::Info(msg) | Self::Success(msg) => write!(f, "{msg}"),
            Self::Warning(msg) => write!(f, "Warning: {msg}"),
            Self::Error(msg) => write!(f, "Error: {msg}"),
            Self::Summary { succeeded, total } => {
                write!(f, "Installed {succeeded} of {total} archives")
            }
        }
    }
}

/// Forwards every event into an unbounded channel.
///
/// The receiving half is the observable stream for a UI. Events sent after
/// the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: UnboundedSender<StatusEvent>,
}

impl ChannelReporter {
    /// Wrap the sending half of a channel.
    pub fn new(tx: UnboundedSender<StatusEvent>) -> Self {
        Self { tx }
    }

    fn emit(&self, event: StatusEvent) {
        let _ = self.tx.send(event);
    }
}

impl Reporter for ChannelReporter {
    fn section(&self, title: &str) {
        self.emit(StatusEvent::Section(title.to_string()));
    }
    fn downloading(&self, archive: &str, current: u64, total: Option<u64>) {
        self.emit(StatusEvent::Downloading {
            archive: archive.to_string(),
            current,
            total,
        });
    }
    fn extracting(&self, archive: &str, current: u64, total: Option<u64>) {
        self.emit(StatusEvent::Extracting {
            archive: archive.to_string(),
            current,
            total,
        });
    }
    fn archive_done(&self, archive: &str, detail: &str) {
        self.emit(StatusEvent::ArchiveDone {
            archive: archive.to_string(),
            detail: detail.to_string(),
        });
    }
    fn archive_failed(&self, archive: &str, reason: &str) {
        self.emit(StatusEvent::ArchiveFailed {
            archive: archive.to_string(),
            reason: reason.to_string(),
        });
    }
    fn info(&self, msg: &str) {
        self.emit(StatusEvent::Info(msg.to_string()));
    }
    fn success(&self, msg: &str) {
        self.emit(StatusEvent::Success(msg.to_string()));
    }
    fn warning(&self, msg: &str) {
        self.emit(StatusEvent::Warning(msg.to_string()));
    }
    fn error(&self, msg: &str) {
        self.emit(StatusEvent::Error(msg.to_string()));
    }
    fn summary(&self, succeeded: usize, total: usize) {
        self.emit(StatusEvent::Summary { succeeded, total });
    }
}
