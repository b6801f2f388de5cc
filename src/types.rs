//! Data types shared across the commit log's public surface.
//!
//! Series identifiers, tag encoding, and wire formats belong to the
//! surrounding database engine and the pluggable [`crate::writer::BlockWriter`];
//! the types here are deliberately minimal placeholders for those concerns.

use std::path::PathBuf;
use std::time::Duration;

use crate::clock::Timestamp;

/// Opaque series identifier. The real tag/series encoding lives in the host
/// database, not in the commit log core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeriesId(pub u64);

/// A single `(timestamp, value)` sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Datapoint {
    pub timestamp: Timestamp,
    pub value: f64,
}

/// Unit the caller's `timestamp` is expressed in. The commit log itself
/// always reasons about block boundaries in nanoseconds; this is forwarded
/// to the `BlockWriter` untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
}

/// Snapshot descriptor for the file a `BlockWriter` currently has open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    pub path: PathBuf,
    pub block_start: Timestamp,
    pub block_size: Duration,
}
