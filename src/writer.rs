//! The `BlockWriter` collaborator contract.
//!
//! A `BlockWriter` owns exactly one open file at a time: `open` binds it to
//! the `[block_start, block_start + block_size)` window, `write` appends one
//! record, `flush` pushes buffered bytes to the next storage layer without a
//! durability guarantee, `sync` is the durability barrier, and `close`
//! releases the file. Implementations call the bound [`OnFlush`] callback
//! synchronously from within `flush`, `sync`, `write`, or `close` -- the
//! WriterLoop is the only caller of any of these methods, so the callback
//! always runs on that same thread.
//!
//! The on-disk record encoding is deliberately left to implementations of
//! this trait, not this crate; [`crate::fs::FsBlockWriter`] is a minimal
//! reference implementation, not a production format.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Timestamp;
use crate::error::WriteError;
use crate::types::{Datapoint, FileHandle, SeriesId, TimeUnit};

/// Result of a flush boundary, delivered to `onFlush` and, from there, to
/// every pending `AckWait` completion.
pub type FlushResult = Result<(), WriteError>;

/// Callback a `BlockWriter` invokes after each flush boundary.
pub type OnFlush = Arc<dyn Fn(FlushResult) + Send + Sync>;

/// The pluggable collaborator that owns on-disk file I/O for one block at a
/// time. See the module docs for the calling contract.
pub trait BlockWriter: Send + 'static {
    /// Open the file for `[block_start, block_start + block_size)`.
    fn open(&mut self, block_start: Timestamp, block_size: Duration) -> io::Result<FileHandle>;

    /// Append one record to the currently open file.
    fn write(
        &mut self,
        series: SeriesId,
        datapoint: Datapoint,
        unit: TimeUnit,
        annotation: &[u8],
    ) -> io::Result<()>;

    /// Buffer-level flush; not necessarily durable.
    fn flush(&mut self) -> io::Result<()>;

    /// Durability barrier, used once by `Open` to fail fast on disk
    /// problems.
    fn sync(&mut self) -> io::Result<()>;

    /// Release the file.
    fn close(&mut self) -> io::Result<()>;
}

/// Produces a fresh [`BlockWriter`] bound to the supplied `onFlush`
/// callback. The WriterLoop calls this once at `Open` (via the caller's
/// thread) and again on every rotation (from its own thread).
pub trait BlockWriterFactory: Send + 'static {
    type Writer: BlockWriter;

    fn create(&self, on_flush: OnFlush) -> Self::Writer;
}
