//! Client-visible error types.
//!
//! `CommitLogError` carries the two sentinel values that are
//! client-observable (`QueueFull`, `Closed`) plus the per-write flush error
//! delivered through the `AckWait` completion path. All other disk-layer
//! errors are routed to the [`crate::fatal::FatalHandler`] and never reach a
//! caller.

use std::fmt;
use std::io;
use std::sync::Arc;

use thiserror::Error;

/// A disk-layer error, made `Clone` so it can be threaded through both the
/// `AckWait` completion callback and the fatal-failure handler without
/// requiring `io::Error: Clone`.
#[derive(Debug, Clone)]
pub struct WriteError(Arc<str>);

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for WriteError {}

impl From<io::Error> for WriteError {
    fn from(err: io::Error) -> Self {
        WriteError(err.to_string().into())
    }
}

impl From<&io::Error> for WriteError {
    fn from(err: &io::Error) -> Self {
        WriteError(err.to_string().into())
    }
}

/// Errors returned to callers of [`crate::engine::CommitLog::write`] and
/// [`crate::engine::CommitLog::active_logs`].
#[non_exhaustive]
#[derive(Debug, Clone, Error)]
pub enum CommitLogError {
    /// The backlog queue was full when a non-blocking offer was attempted.
    #[error("commit log backlog queue is full")]
    QueueFull,
    /// The engine has been closed and accepts no further work.
    #[error("commit log is closed")]
    Closed,
    /// The write was accepted but its enclosing flush boundary failed.
    #[error("commit log write failed to flush: {0}")]
    Flush(#[from] WriteError),
}
