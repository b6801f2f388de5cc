//! The WriterLoop: sole mutator of the active `BlockWriter`, rotation, and
//! the flush-completion callback.
//!
//! The live writer value is deliberately *not* shared behind any lock: it
//! is a plain local variable owned by this thread's stack frame for the
//! lifetime of the loop (see [`crate::state`] module docs). Only the small
//! `WriterStateView` -- active file + expiry -- is shared, via
//! `writer_state`, so `ActiveLogs` can read it without touching the writer
//! itself.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::clock::{self, Clock, Timestamp};
use crate::fatal::{FatalError, FatalErrorKind, FatalHandler};
use crate::metrics::Metrics;
use crate::queue::{Completion, WorkItem};
use crate::state::SharedWriterState;
use crate::writer::{BlockWriter, BlockWriterFactory, FlushResult, OnFlush};

/// Everything the WriterLoop needs besides the already-open initial writer
/// and its expiry, which `Open` produces on the caller's thread before this
/// loop starts.
pub(crate) struct LoopContext<F: BlockWriterFactory> {
    pub(crate) factory: F,
    pub(crate) block_size: Duration,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) writer_state: SharedWriterState,
    pub(crate) metrics: Arc<Metrics>,
    pub(crate) fatal_handler: FatalHandler,
    pub(crate) on_flush: OnFlush,
}

/// Build the `onFlush` callback bound into every `BlockWriter` the factory
/// creates (the initial one and every rotation). It runs synchronously on
/// the WriterLoop thread, re-entrant from inside `BlockWriter` calls -- see
/// [`crate::state::FlushState`] docs for why it gets its own lock.
pub(crate) fn make_on_flush(
    clock: Arc<dyn Clock>,
    flush_state: Arc<Mutex<crate::state::FlushState>>,
    pending: Arc<Mutex<Vec<Completion>>>,
    metrics: Arc<Metrics>,
    fatal_handler: FatalHandler,
) -> OnFlush {
    Arc::new(move |result: FlushResult| {
        flush_state.lock().last_flush_at = clock.now();

        if let Err(err) = &result {
            metrics.inc_errors();
            metrics.inc_flush_errors();
            log::error!("commitlog: flush failed: {err}");
            fatal_handler(FatalError::new(FatalErrorKind::Flush, err.clone()));
        }

        let drained: Vec<Completion> = pending.lock().drain(..).collect();
        for completion in drained {
            completion(result.clone());
        }
        metrics.inc_flush_done();
    })
}

/// Run the WriterLoop to completion. Returns only once `receiver` is
/// disconnected (every `Sender` clone dropped), at which point the writer
/// has been closed and its result handed to `close_tx`.
pub(crate) fn run<F: BlockWriterFactory>(
    ctx: LoopContext<F>,
    initial_writer: F::Writer,
    initial_expire_at: Timestamp,
    receiver: Receiver<WorkItem>,
    close_tx: Sender<io::Result<()>>,
    pending: Arc<Mutex<Vec<Completion>>>,
) {
    let LoopContext {
        factory,
        block_size,
        clock,
        writer_state,
        metrics,
        fatal_handler,
        on_flush,
    } = ctx;

    let mut writer = Some(initial_writer);
    let mut expire_at = initial_expire_at;

    for item in receiver {
        match item {
            WorkItem::Write {
                series,
                datapoint,
                unit,
                annotation,
                completion,
            } => {
                // Registered before the write so a flush this call triggers
                // (directly, via `onFlush`) notifies it.
                if let Some(completion) = completion {
                    pending.lock().push(completion);
                }

                let now = clock.now();
                if now >= expire_at {
                    match rotate(
                        &factory,
                        &mut writer,
                        &on_flush,
                        now,
                        block_size,
                        &writer_state,
                        &metrics,
                    ) {
                        Ok(next_expire_at) => expire_at = next_expire_at,
                        Err(err) => {
                            metrics.inc_errors();
                            metrics.inc_open_errors();
                            log::error!("commitlog: rotation open failed: {err}");
                            fatal_handler(FatalError::new(FatalErrorKind::Open, err));
                            continue;
                        }
                    }
                }

                let Some(active) = writer.as_mut() else {
                    // Previous rotation failed and left no writer; this
                    // item is dropped, matching the item being dropped on
                    // any other WriterLoop-side error.
                    continue;
                };
                match active.write(series, datapoint, unit, &annotation) {
                    Ok(()) => metrics.inc_success(),
                    Err(err) => {
                        metrics.inc_errors();
                        log::error!("commitlog: write failed: {err}");
                        fatal_handler(FatalError::new(FatalErrorKind::Write, err));
                    }
                }
            }
            WorkItem::Flush => {
                // Error handling for a flush boundary lives entirely in
                // `onFlush`, invoked synchronously from inside this call;
                // inspecting the return value here too would double-count
                // and double-dispatch to the fatal handler.
                if let Some(active) = writer.as_mut() {
                    let _ = active.flush();
                }
            }
        }
    }

    writer_state.write().active_file = None;
    let close_result: io::Result<()> = match writer {
        Some(mut active) => active.close(),
        None => Ok(()),
    };
    let _ = close_tx.send(close_result);
}

/// Close the current writer, if any (its close-error is non-fatal, spec
/// item 4.5's "close error on rotation"), and open a fresh one for the
/// block containing `now`. Must only be called from the WriterLoop thread.
fn rotate<F: BlockWriterFactory>(
    factory: &F,
    writer: &mut Option<F::Writer>,
    on_flush: &OnFlush,
    now: Timestamp,
    block_size: Duration,
    writer_state: &SharedWriterState,
    metrics: &Metrics,
) -> io::Result<Timestamp> {
    if let Some(mut old) = writer.take() {
        if let Err(err) = old.close() {
            metrics.inc_close_errors();
            log::warn!("commitlog: rotation close failed, discarding old writer: {err}");
        }
    }

    let mut fresh = factory.create(on_flush.clone());
    let block_start = clock::truncate(now, block_size);
    let handle = fresh.open(block_start, block_size)?;
    let expire_at = block_start + block_size.as_nanos() as Timestamp;

    {
        let mut view = writer_state.write();
        view.active_file = Some(handle);
        view.writer_expire_at = expire_at;
    }

    *writer = Some(fresh);
    Ok(expire_at)
}
