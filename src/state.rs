//! The three independently-scoped locks at the heart of the concurrency
//! core: `ClosedState`, `WriterStateView`, and `FlushState`. Lock ordering
//! when more than one is held: `ClosedState` before `WriterStateView`;
//! `FlushState` is never held jointly with either (see module docs on
//! [`crate::writer_loop`] for why).

use std::sync::Arc;

use parking_lot::RwLock;

use crate::clock::Timestamp;
use crate::types::FileHandle;

/// Gates every enqueue. Once `closed` is true, no new `WorkItem` is ever
/// offered onto the queue.
pub(crate) struct ClosedState {
    pub(crate) closed: bool,
}

impl ClosedState {
    pub(crate) fn new() -> Self {
        Self { closed: false }
    }
}

/// The externally-visible slice of `WriterState`: the active file and its
/// expiry. The live `BlockWriter` value itself is *not* stored here -- see
/// [`crate::writer_loop`] docs for why -- so this struct, and therefore the
/// lock guarding it, never needs to be generic over the writer type.
pub(crate) struct WriterStateView {
    pub(crate) writer_expire_at: Timestamp,
    pub(crate) active_file: Option<FileHandle>,
}

impl WriterStateView {
    pub(crate) fn new(writer_expire_at: Timestamp, active_file: Option<FileHandle>) -> Self {
        Self {
            writer_expire_at,
            active_file,
        }
    }
}

pub(crate) type SharedWriterState = Arc<RwLock<WriterStateView>>;

/// Tracks the last time any flush boundary completed. Has its own lock
/// because `onFlush` re-enters this code synchronously from inside
/// `BlockWriter` calls the WriterLoop makes; sharing a lock with
/// `WriterStateView` would risk the WriterLoop holding that lock while the
/// callback needs it too.
pub(crate) struct FlushState {
    pub(crate) last_flush_at: Timestamp,
}

impl FlushState {
    pub(crate) fn new(now: Timestamp) -> Self {
        Self { last_flush_at: now }
    }
}
