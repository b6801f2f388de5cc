//! Background periodic ticker that posts `FlushItem`s onto the queue.
//!
//! Deliberately does not synchronize with the WriterLoop; it only ensures
//! that, absent write traffic, the on-disk buffer is flushed at least
//! roughly every `interval`.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::{Mutex, RwLock};

use crate::clock::Clock;
use crate::metrics::Metrics;
use crate::queue::WorkItem;
use crate::state::{ClosedState, FlushState};

/// Runs until `ClosedState.closed` is observed true. Returns by value, no
/// error path: a send failure here just means the WriterLoop already
/// exited, which only happens after `Close` has set `closed`.
pub(crate) fn run(
    closed_state: Arc<RwLock<ClosedState>>,
    flush_state: Arc<Mutex<FlushState>>,
    clock: Arc<dyn Clock>,
    sender: Sender<WorkItem>,
    interval: Duration,
    metrics: Arc<Metrics>,
    queue_capacity: usize,
) {
    let interval_ns = interval.as_nanos() as i64;
    let mut sleep_override: Option<Duration> = None;

    loop {
        metrics.set_queue_depth(sender.len() as i64);
        metrics.set_queue_capacity(queue_capacity as i64);

        thread::sleep(sleep_override.take().unwrap_or(interval));

        let now = clock.now();
        let last_flush_at = flush_state.lock().last_flush_at;
        let elapsed = now.saturating_sub(last_flush_at);
        if elapsed < interval_ns {
            let remaining = (interval_ns - elapsed).max(0) as u64;
            sleep_override = Some(Duration::from_nanos(remaining));
            continue;
        }

        if closed_state.read().closed {
            return;
        }

        if sender.send(WorkItem::Flush).is_err() {
            return;
        }
    }
}
