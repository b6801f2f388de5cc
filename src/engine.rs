//! The public engine: `Open`, `Write`, `ActiveLogs`, `Close`.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::bounded;
use parking_lot::{Mutex, RwLock};

use crate::clock;
use crate::config::{Options, WriteStrategy};
use crate::error::CommitLogError;
use crate::flusher;
use crate::metrics::Metrics;
use crate::queue::{self, Completion, WorkItem};
use crate::state::{ClosedState, FlushState, SharedWriterState, WriterStateView};
use crate::types::{Datapoint, FileHandle, SeriesId, TimeUnit};
use crate::writer::{BlockWriter, BlockWriterFactory};
use crate::writer_loop::{self, LoopContext};

/// A durable, time-block-partitioned write-ahead log.
///
/// Constructed with [`CommitLog::open`], given a [`BlockWriterFactory`] that
/// supplies the on-disk collaborator. Cheaply `Clone`-free: share one
/// instance behind an `Arc` across writer threads.
pub struct CommitLog {
    options: Options,
    closed_state: Arc<RwLock<ClosedState>>,
    writer_state: SharedWriterState,
    sender: Mutex<Option<crossbeam_channel::Sender<WorkItem>>>,
    writer_thread: Mutex<Option<JoinHandle<()>>>,
    flusher_thread: Mutex<Option<JoinHandle<()>>>,
    close_rx: Mutex<Option<crossbeam_channel::Receiver<io::Result<()>>>>,
}

impl CommitLog {
    /// Open the initial `BlockWriter` for the block containing `now`, sync
    /// it to fail fast on disk problems, then spawn the WriterLoop and (if
    /// `flush_interval > 0`) the Flusher.
    ///
    /// On error the caller holds nothing reusable: construct a new
    /// `CommitLog` rather than retrying this one.
    pub fn open<F: BlockWriterFactory>(factory: F, options: Options) -> io::Result<Self> {
        let metrics = Arc::new(Metrics::new(&options.instrument));
        let flush_state = Arc::new(Mutex::new(FlushState::new(options.clock.now())));
        let pending: Arc<Mutex<Vec<Completion>>> = Arc::new(Mutex::new(Vec::new()));

        let on_flush = writer_loop::make_on_flush(
            options.clock.clone(),
            flush_state.clone(),
            pending.clone(),
            metrics.clone(),
            options.fatal_handler.clone(),
        );

        let mut writer = factory.create(on_flush.clone());
        let now = options.clock.now();
        let block_start = clock::truncate(now, options.block_size);
        let handle: FileHandle = writer.open(block_start, options.block_size)?;
        writer.sync()?;
        let expire_at = block_start + options.block_size.as_nanos() as i64;

        let writer_state: SharedWriterState =
            Arc::new(RwLock::new(WriterStateView::new(expire_at, Some(handle))));
        let closed_state = Arc::new(RwLock::new(ClosedState::new()));

        let (sender, receiver) = queue::channel(options.backlog_queue_size);
        let (close_tx, close_rx) = bounded(1);

        let loop_ctx = LoopContext {
            factory,
            block_size: options.block_size,
            clock: options.clock.clone(),
            writer_state: writer_state.clone(),
            metrics: metrics.clone(),
            fatal_handler: options.fatal_handler.clone(),
            on_flush,
        };

        let writer_thread = thread::Builder::new()
            .name("commitlog-writer".into())
            .spawn(move || writer_loop::run(loop_ctx, writer, expire_at, receiver, close_tx, pending))
            .expect("failed to spawn commitlog writer thread");

        let flusher_thread = if options.flush_interval.is_zero() {
            None
        } else {
            let closed_state = closed_state.clone();
            let flush_state = flush_state.clone();
            let clock = options.clock.clone();
            let sender = sender.clone();
            let metrics = metrics.clone();
            let interval = options.flush_interval;
            let capacity = options.backlog_queue_size;
            Some(
                thread::Builder::new()
                    .name("commitlog-flusher".into())
                    .spawn(move || {
                        flusher::run(closed_state, flush_state, clock, sender, interval, metrics, capacity)
                    })
                    .expect("failed to spawn commitlog flusher thread"),
            )
        };

        Ok(Self {
            options,
            closed_state,
            writer_state,
            sender: Mutex::new(Some(sender)),
            writer_thread: Mutex::new(Some(writer_thread)),
            flusher_thread: Mutex::new(flusher_thread),
            close_rx: Mutex::new(Some(close_rx)),
        })
    }

    /// Submit one datapoint, per the configured [`WriteStrategy`].
    pub fn write(
        &self,
        series: SeriesId,
        datapoint: Datapoint,
        unit: TimeUnit,
        annotation: impl Into<Vec<u8>>,
    ) -> Result<(), CommitLogError> {
        let annotation = annotation.into();
        match self.options.strategy {
            WriteStrategy::WriteWait => self.write_wait(series, datapoint, unit, annotation),
            WriteStrategy::WriteBehind => self.write_behind(series, datapoint, unit, annotation),
        }
    }

    fn write_wait(
        &self,
        series: SeriesId,
        datapoint: Datapoint,
        unit: TimeUnit,
        annotation: Vec<u8>,
    ) -> Result<(), CommitLogError> {
        let guard = self.closed_state.read();
        if guard.closed {
            drop(guard);
            return Err(CommitLogError::Closed);
        }

        let (ack_tx, ack_rx) = bounded(1);
        let completion: Completion = Box::new(move |result| {
            let _ = ack_tx.send(result);
        });
        let item = WorkItem::Write {
            series,
            datapoint,
            unit,
            annotation,
            completion: Some(completion),
        };

        let offer_result = self.offer(item);
        drop(guard);
        offer_result?;

        match ack_rx.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(CommitLogError::Flush(err)),
            Err(_) => Err(CommitLogError::Closed),
        }
    }

    fn write_behind(
        &self,
        series: SeriesId,
        datapoint: Datapoint,
        unit: TimeUnit,
        annotation: Vec<u8>,
    ) -> Result<(), CommitLogError> {
        let guard = self.closed_state.read();
        if guard.closed {
            drop(guard);
            return Err(CommitLogError::Closed);
        }
        let item = WorkItem::Write {
            series,
            datapoint,
            unit,
            annotation,
            completion: None,
        };
        let result = self.offer(item);
        drop(guard);
        result
    }

    fn offer(&self, item: WorkItem) -> Result<(), CommitLogError> {
        let guard = self.sender.lock();
        match guard.as_ref() {
            Some(sender) => queue::offer(sender, item),
            None => Err(CommitLogError::Closed),
        }
    }

    /// Snapshot of the currently active file, if any.
    pub fn active_logs(&self) -> Result<Vec<FileHandle>, CommitLogError> {
        let closed_guard = self.closed_state.read();
        if closed_guard.closed {
            return Err(CommitLogError::Closed);
        }
        let view = self.writer_state.read();
        let result = view.active_file.clone().into_iter().collect();
        drop(view);
        drop(closed_guard);
        Ok(result)
    }

    /// Idempotent shutdown. The first call closes the queue, joins the
    /// Flusher (if any) and then the WriterLoop, and returns the writer's
    /// final close error. Every subsequent call is a no-op returning
    /// `Ok(())`.
    pub fn close(&self) -> io::Result<()> {
        {
            let mut guard = self.closed_state.write();
            if guard.closed {
                return Ok(());
            }
            guard.closed = true;
        }

        if let Some(handle) = self.flusher_thread.lock().take() {
            let _ = handle.join();
        }

        self.sender.lock().take();

        if let Some(handle) = self.writer_thread.lock().take() {
            let _ = handle.join();
        }

        match self.close_rx.lock().take() {
            Some(rx) => rx.recv().unwrap_or(Ok(())),
            None => Ok(()),
        }
    }
}

impl Drop for CommitLog {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
