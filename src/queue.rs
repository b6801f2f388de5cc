//! The bounded work queue between callers and the WriterLoop.
//!
//! Offers are always non-blocking: a blocking offer would couple `Write`
//! latency to disk latency and defeat the backpressure contract. A full
//! queue is a first-class, client-visible error (`QueueFull`), never a
//! silent retry.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::error::CommitLogError;
use crate::types::{Datapoint, SeriesId, TimeUnit};
use crate::writer::FlushResult;

/// Invoked once, from the WriterLoop thread, with the result of the flush
/// boundary that subsumed this item's write.
pub(crate) type Completion = Box<dyn FnOnce(FlushResult) + Send>;

/// A unit of work queued for the WriterLoop.
pub(crate) enum WorkItem {
    Write {
        series: SeriesId,
        datapoint: Datapoint,
        unit: TimeUnit,
        annotation: Vec<u8>,
        completion: Option<Completion>,
    },
    Flush,
}

/// Construct the bounded channel backing the queue, returning the ends
/// callers, the Flusher, and the WriterLoop each hold.
pub(crate) fn channel(capacity: usize) -> (Sender<WorkItem>, Receiver<WorkItem>) {
    bounded(capacity.max(1))
}

/// Non-blocking offer. Maps a full queue to `QueueFull` and a disconnected
/// queue (the WriterLoop has already drained and exited) to `Closed`.
pub(crate) fn offer(sender: &Sender<WorkItem>, item: WorkItem) -> Result<(), CommitLogError> {
    sender.try_send(item).map_err(|err| match err {
        TrySendError::Full(_) => CommitLogError::QueueFull,
        TrySendError::Disconnected(_) => CommitLogError::Closed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_succeeds_while_capacity_remains() {
        let (tx, _rx) = channel(2);
        assert!(offer(&tx, WorkItem::Flush).is_ok());
        assert!(offer(&tx, WorkItem::Flush).is_ok());
    }

    #[test]
    fn offer_reports_queue_full_without_blocking() {
        let (tx, _rx) = channel(1);
        assert!(offer(&tx, WorkItem::Flush).is_ok());
        match offer(&tx, WorkItem::Flush) {
            Err(CommitLogError::QueueFull) => {}
            other => panic!("expected QueueFull, got {other:?}"),
        }
    }

    #[test]
    fn offer_reports_closed_once_consumer_is_gone() {
        let (tx, rx) = channel(1);
        drop(rx);
        match offer(&tx, WorkItem::Flush) {
            Err(CommitLogError::Closed) => {}
            other => panic!("expected Closed, got {other:?}"),
        }
    }
}
