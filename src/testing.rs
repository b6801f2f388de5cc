//! Test doubles shared between this crate's unit tests and downstream
//! integration tests. Gated behind `test-util` so production builds never
//! link it in; exposed to `tests/` via a self-referencing dev-dependency
//! on this crate with that feature enabled.

use std::io;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::clock::{Clock, Timestamp};
use crate::types::{Datapoint, FileHandle, SeriesId, TimeUnit};
use crate::writer::{BlockWriter, BlockWriterFactory, OnFlush};

/// A settable, advanceable clock for deterministic rotation/queue/close
/// tests. Starts at zero.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start)),
        }
    }

    pub fn set(&self, value: Timestamp) {
        self.now.store(value, Ordering::SeqCst);
    }

    pub fn advance(&self, delta: Timestamp) {
        self.now.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

/// One observed call made to a [`RecordingBlockWriter`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedEvent {
    Open { block_start: Timestamp, block_size: Duration },
    Write { series: SeriesId, datapoint: Datapoint, unit: TimeUnit },
    Flush,
    Sync,
    Close,
}

/// Shared log every [`RecordingBlockWriter`] created by one
/// [`RecordingBlockWriterFactory`] appends to, in call order across every
/// instance (so rotation's close-then-open sequence is observable).
pub type RecordedEvents = Arc<Mutex<Vec<RecordedEvent>>>;

/// A fake [`BlockWriter`] that records every call instead of touching disk,
/// optionally failing `open` at a configured 1-indexed call count (for
/// exercising the fatal-open-failure path without real I/O).
pub struct RecordingBlockWriter {
    events: RecordedEvents,
    open_calls: Arc<AtomicI64>,
    fail_open_at: Option<i64>,
    on_flush: OnFlush,
}

impl BlockWriter for RecordingBlockWriter {
    fn open(&mut self, block_start: Timestamp, block_size: Duration) -> io::Result<FileHandle> {
        let call = self.open_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_open_at == Some(call) {
            return Err(io::Error::new(io::ErrorKind::Other, "simulated open failure"));
        }
        self.events
            .lock()
            .unwrap()
            .push(RecordedEvent::Open { block_start, block_size });
        Ok(FileHandle {
            path: format!("recording://{block_start}").into(),
            block_start,
            block_size,
        })
    }

    fn write(
        &mut self,
        series: SeriesId,
        datapoint: Datapoint,
        unit: TimeUnit,
        _annotation: &[u8],
    ) -> io::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(RecordedEvent::Write { series, datapoint, unit });
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.events.lock().unwrap().push(RecordedEvent::Flush);
        (self.on_flush)(Ok(()));
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.events.lock().unwrap().push(RecordedEvent::Sync);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.events.lock().unwrap().push(RecordedEvent::Close);
        (self.on_flush)(Ok(()));
        Ok(())
    }
}

/// Produces [`RecordingBlockWriter`]s that all append to one shared event
/// log, simulating the WriterLoop's single-writer-at-a-time ownership.
pub struct RecordingBlockWriterFactory {
    events: RecordedEvents,
    open_calls: Arc<AtomicI64>,
    fail_open_at: Option<i64>,
}

impl RecordingBlockWriterFactory {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            open_calls: Arc::new(AtomicI64::new(0)),
            fail_open_at: None,
        }
    }

    /// `open` fails on its `n`th call (1-indexed) across every writer this
    /// factory has produced.
    pub fn failing_open_on_call(mut self, n: i64) -> Self {
        self.fail_open_at = Some(n);
        self
    }

    pub fn events(&self) -> RecordedEvents {
        self.events.clone()
    }
}

impl Default for RecordingBlockWriterFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockWriterFactory for RecordingBlockWriterFactory {
    type Writer = RecordingBlockWriter;

    fn create(&self, on_flush: OnFlush) -> Self::Writer {
        RecordingBlockWriter {
            events: self.events.clone(),
            open_calls: self.open_calls.clone(),
            fail_open_at: self.fail_open_at,
            on_flush,
        }
    }
}

/// Lets a test block the WriterLoop mid-dequeue, to observe the bounded
/// queue filling up while nothing drains it.
pub struct GateHandle {
    entered_rx: crossbeam_channel::Receiver<()>,
    release_tx: crossbeam_channel::Sender<()>,
}

impl GateHandle {
    /// Blocks until the WriterLoop's first gated `write()` call has
    /// started (and is itself now blocked waiting on [`Self::release`]).
    pub fn wait_until_entered(&self) {
        let _ = self.entered_rx.recv();
    }

    /// Lets the gated `write()` call (and every call after it) proceed.
    pub fn release(&self) {
        let _ = self.release_tx.send(());
    }
}

/// A [`BlockWriter`] whose first `write()` call blocks until released via
/// the paired [`GateHandle`]; every later call passes straight through.
pub struct PausingBlockWriter {
    entered_tx: crossbeam_channel::Sender<()>,
    release_rx: crossbeam_channel::Receiver<()>,
    gated: Arc<std::sync::atomic::AtomicBool>,
}

impl BlockWriter for PausingBlockWriter {
    fn open(&mut self, block_start: Timestamp, block_size: Duration) -> io::Result<FileHandle> {
        Ok(FileHandle {
            path: format!("pausing://{block_start}").into(),
            block_start,
            block_size,
        })
    }

    fn write(
        &mut self,
        _series: SeriesId,
        _datapoint: Datapoint,
        _unit: TimeUnit,
        _annotation: &[u8],
    ) -> io::Result<()> {
        if !self.gated.swap(true, Ordering::SeqCst) {
            let _ = self.entered_tx.send(());
            let _ = self.release_rx.recv();
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Produces [`PausingBlockWriter`]s; all share the one gate since the
/// WriterLoop only ever owns one at a time.
pub struct PausingBlockWriterFactory {
    entered_tx: crossbeam_channel::Sender<()>,
    release_rx: crossbeam_channel::Receiver<()>,
    gated: Arc<std::sync::atomic::AtomicBool>,
}

impl PausingBlockWriterFactory {
    pub fn new() -> (Self, GateHandle) {
        let (entered_tx, entered_rx) = crossbeam_channel::bounded(1);
        let (release_tx, release_rx) = crossbeam_channel::bounded(1);
        let factory = Self {
            entered_tx,
            release_rx,
            gated: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        };
        (factory, GateHandle { entered_rx, release_tx })
    }
}

impl BlockWriterFactory for PausingBlockWriterFactory {
    type Writer = PausingBlockWriter;

    fn create(&self, _on_flush: OnFlush) -> Self::Writer {
        PausingBlockWriter {
            entered_tx: self.entered_tx.clone(),
            release_rx: self.release_rx.clone(),
            gated: self.gated.clone(),
        }
    }
}
