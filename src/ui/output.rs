//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag. Errors
//! are always shown. Nothing printed here ever contains a token: the
//! pipeline only hands over paths, hashes, counts and logins.

use std::fmt::Display;
use std::io::Write;

use crate::core::types::BlobRef;
use crate::sync::{Parent, ProgressSink, SyncEvent, UploadError};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - errors only
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags. Quiet wins over debug.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print a success message (respects quiet mode).
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Reports a publish run on the terminal.
///
/// One `.` per stored blob, flushed immediately so progress is visible
/// while uploads are in flight.
#[derive(Debug, Clone, Copy)]
pub struct TerminalProgress {
    verbosity: Verbosity,
}

impl TerminalProgress {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    /// Terminate the line of dots once uploads are done.
    fn end_dots(&self, uploaded: usize) {
        if uploaded > 0 {
            print("", self.verbosity);
        }
    }
}

impl ProgressSink for TerminalProgress {
    fn blob_uploaded(&self, blob: &BlobRef) {
        if self.verbosity == Verbosity::Quiet {
            return;
        }
        if self.verbosity == Verbosity::Debug {
            debug(format!("blob {} {}", blob.content_hash.short(7), blob.path), self.verbosity);
            return;
        }
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, ".");
        let _ = stdout.flush();
    }

    fn upload_failed(&self, err: &UploadError) {
        warn(err, self.verbosity);
    }

    fn event(&self, event: SyncEvent<'_>) {
        let v = self.verbosity;
        match event {
            SyncEvent::Authenticated { login } => print(format!("Authenticated as: {}", login), v),
            SyncEvent::Skipped(skip) => warn(skip, v),
            SyncEvent::Enumerated {
                tracked,
                publishable,
            } => print(
                format!("Uploading {} of {} tracked files", publishable, tracked),
                v,
            ),
            SyncEvent::UploadsFinished { uploaded, failed } => {
                if v == Verbosity::Normal {
                    self.end_dots(uploaded);
                }
                if failed > 0 {
                    warn(format!("{} file(s) failed to upload", failed), v);
                }
            }
            SyncEvent::ParentResolved(Parent::HasParent(tip)) => {
                debug(format!("branch tip is {}", tip), v)
            }
            SyncEvent::ParentResolved(Parent::NoParent) => {
                debug("branch does not exist yet; creating a root commit", v)
            }
            SyncEvent::TreeCreated(tree) => debug(format!("tree {}", tree.tree_hash), v),
            SyncEvent::CommitCreated(commit) => {
                debug(format!("commit {}", commit.commit_hash), v)
            }
        }
    }
}
