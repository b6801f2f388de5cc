//! The fatal-failure handler: the single injection point every disk-layer
//! error not covered by the two client-visible sentinels flows through.
//!
//! The default policy is process-fatal by design: a write-ahead log that
//! silently drops records after a disk error is worse than one that halts.
//! Tests substitute a recording handler instead of exercising the default.

use std::fmt;
use std::sync::Arc;

use crate::error::WriteError;

/// Which `BlockWriter` operation produced the error passed to the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalErrorKind {
    Open,
    Write,
    Flush,
}

impl fmt::Display for FatalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FatalErrorKind::Open => "open",
            FatalErrorKind::Write => "write",
            FatalErrorKind::Flush => "flush",
        };
        f.write_str(name)
    }
}

/// An operational error dispatched to the [`FatalHandler`].
#[derive(Debug, Clone)]
pub struct FatalError {
    pub kind: FatalErrorKind,
    pub error: WriteError,
}

impl FatalError {
    pub(crate) fn new(kind: FatalErrorKind, error: impl Into<WriteError>) -> Self {
        Self {
            kind,
            error: error.into(),
        }
    }
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.error)
    }
}

/// Policy invoked for every operational-fatal disk error that the engine
/// itself cannot recover from.
///
/// The handler is a field on the engine, set during `Open`, so alternative
/// policies (degrade-and-continue, panic, a recording handler in tests) can
/// be substituted without touching the WriterLoop or Flusher.
pub type FatalHandler = Arc<dyn Fn(FatalError) + Send + Sync>;

/// The default handler: log, then abort the process.
pub fn default_fatal_handler() -> FatalHandler {
    Arc::new(|err: FatalError| {
        log::error!("commitlog: fatal {err}, halting process");
        std::process::abort();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn fatal_error_display_includes_kind_and_message() {
        let io_err = io::Error::new(io::ErrorKind::Other, "disk full");
        let err = FatalError::new(FatalErrorKind::Flush, &io_err);
        assert_eq!(err.to_string(), "flush error: disk full");
    }
}
