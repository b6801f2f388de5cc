//! `commitlog` -- a durable, time-block-partitioned write-ahead log core
//! for a time-series database.
//!
//! Writers submit `(series, datapoint, unit, annotation)` tuples through
//! [`CommitLog::write`]; the engine serializes them into fixed-duration
//! block files via a pluggable [`BlockWriter`], provides bounded-queue
//! backpressure ([`CommitLogError::QueueFull`]), periodic background
//! flushing, and two durability modes ([`WriteStrategy`]). Files roll over
//! automatically when the current block's time window expires.
//!
//! The on-disk record encoding, the database's series/tag model, and log
//! replay are out of scope here and belong to the [`BlockWriter`]
//! collaborator and the surrounding system; [`fs::FsBlockWriter`] is a
//! minimal reference implementation, not a production format.

mod clock;
mod config;
mod engine;
mod error;
mod fatal;
mod flusher;
pub mod fs;
mod metrics;
mod queue;
mod state;
mod types;
mod writer;
mod writer_loop;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use clock::{Clock, SystemClock, Timestamp};
pub use config::{ConfigError, InstrumentOptions, Options, OptionsBuilder, WriteStrategy};
pub use engine::CommitLog;
pub use error::{CommitLogError, WriteError};
pub use fatal::{default_fatal_handler, FatalError, FatalErrorKind, FatalHandler};
pub use types::{Datapoint, FileHandle, SeriesId, TimeUnit};
pub use writer::{BlockWriter, BlockWriterFactory, FlushResult, OnFlush};
