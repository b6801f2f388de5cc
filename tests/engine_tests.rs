//! Integration tests against the public `commitlog` API, covering the
//! engine's scenario walkthroughs: happy write, queue-full backpressure,
//! rotation, flush cadence, close-drains-pending-acks, and fatal open
//! failure.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use commitlog::testing::{ManualClock, PausingBlockWriterFactory, RecordedEvent, RecordingBlockWriterFactory};
use commitlog::{CommitLog, CommitLogError, Datapoint, FatalError, OptionsBuilder, SeriesId, TimeUnit, WriteStrategy};

fn sample(timestamp: i64, value: f64) -> Datapoint {
    Datapoint { timestamp, value }
}

/// S1 — happy write: a single AckWait write succeeds once the Flusher's
/// periodic tick pushes it past the flush boundary.
#[test]
fn happy_write_completes_once_the_flusher_ticks() {
    let factory = RecordingBlockWriterFactory::new();
    let events = factory.events();
    let options = OptionsBuilder::new()
        .strategy(WriteStrategy::WriteWait)
        .backlog_queue_size(4)
        .block_size(Duration::from_secs(3600))
        .flush_interval(Duration::from_millis(5))
        .build()
        .expect("valid options");

    let log = CommitLog::open(factory, options).expect("open");
    let result = log.write(SeriesId(1), sample(500, 1.0), TimeUnit::Nanoseconds, &b""[..]);
    assert!(result.is_ok(), "expected a successful ack, got {result:?}");

    log.close().expect("close");

    let recorded = events.lock().unwrap().clone();
    assert!(recorded.contains(&RecordedEvent::Write {
        series: SeriesId(1),
        datapoint: sample(500, 1.0),
        unit: TimeUnit::Nanoseconds,
    }));
    assert!(recorded.iter().any(|event| *event == RecordedEvent::Flush));
}

/// S2 — queue full: pausing the WriterLoop mid-dequeue lets the bounded
/// queue fill up and overflow deterministically.
#[test]
fn queue_full_is_reported_once_capacity_is_exhausted() {
    let (factory, gate) = PausingBlockWriterFactory::new();
    let options = OptionsBuilder::new()
        .strategy(WriteStrategy::WriteBehind)
        .backlog_queue_size(4)
        .block_size(Duration::from_secs(3600))
        .build()
        .expect("valid options");

    let log = CommitLog::open(factory, options).expect("open");

    let first = log.write(SeriesId(0), sample(0, 0.0), TimeUnit::Nanoseconds, &b""[..]);
    assert!(first.is_ok());
    gate.wait_until_entered();

    let mut outcomes = Vec::new();
    for i in 1..=6u64 {
        outcomes.push(log.write(SeriesId(i), sample(0, 0.0), TimeUnit::Nanoseconds, &b""[..]));
    }

    let failures = outcomes
        .iter()
        .filter(|r| matches!(r, Err(CommitLogError::QueueFull)))
        .count();
    assert!(failures >= 2, "expected at least 2 QueueFull failures, got {failures}: {outcomes:?}");

    gate.release();
    log.close().expect("close");
}

/// S3 — rotation: advancing the clock past a block's expiry rotates the
/// writer, closing the old file and opening the new one.
#[test]
fn crossing_a_block_boundary_rotates_the_writer() {
    let factory = RecordingBlockWriterFactory::new();
    let events = factory.events();
    let clock = Arc::new(ManualClock::new(500));
    let options = OptionsBuilder::new()
        .strategy(WriteStrategy::WriteBehind)
        .backlog_queue_size(4)
        .block_size(Duration::from_nanos(1000))
        .clock(clock.clone())
        .build()
        .expect("valid options");

    let log = CommitLog::open(factory, options).expect("open");
    log.write(SeriesId(1), sample(500, 1.0), TimeUnit::Nanoseconds, &b""[..])
        .expect("queued");

    clock.advance(1000);
    log.write(SeriesId(2), sample(1500, 2.0), TimeUnit::Nanoseconds, &b""[..])
        .expect("queued");

    log.close().expect("close");

    let recorded = events.lock().unwrap().clone();
    assert_eq!(
        recorded,
        vec![
            RecordedEvent::Open { block_start: 0, block_size: Duration::from_nanos(1000) },
            RecordedEvent::Sync,
            RecordedEvent::Write { series: SeriesId(1), datapoint: sample(500, 1.0), unit: TimeUnit::Nanoseconds },
            RecordedEvent::Close,
            RecordedEvent::Open { block_start: 1000, block_size: Duration::from_nanos(1000) },
            RecordedEvent::Write { series: SeriesId(2), datapoint: sample(1500, 2.0), unit: TimeUnit::Nanoseconds },
            RecordedEvent::Close,
        ]
    );
}

/// S4 — flush cadence: with no writes at all, the Flusher still keeps the
/// buffer flushed at roughly the configured interval.
#[test]
fn flusher_keeps_flushing_without_any_writes() {
    let factory = RecordingBlockWriterFactory::new();
    let events = factory.events();
    let options = OptionsBuilder::new()
        .backlog_queue_size(4)
        .block_size(Duration::from_secs(3600))
        .flush_interval(Duration::from_millis(10))
        .build()
        .expect("valid options");

    let log = CommitLog::open(factory, options).expect("open");
    std::thread::sleep(Duration::from_millis(70));
    log.close().expect("close");

    let flush_count = events.lock().unwrap().iter().filter(|e| **e == RecordedEvent::Flush).count();
    assert!(flush_count >= 2, "expected at least 2 flushes, got {flush_count}");
}

/// S5 — close drains: every pending AckWait completion fires before
/// `Close` returns, because the final `writer.Close()` call is itself a
/// flush boundary.
#[test]
fn close_drains_every_pending_completion_before_returning() {
    let factory = RecordingBlockWriterFactory::new();
    let events = factory.events();
    let clock = Arc::new(ManualClock::new(0));
    let options = OptionsBuilder::new()
        .strategy(WriteStrategy::WriteWait)
        .backlog_queue_size(8)
        .block_size(Duration::from_secs(3600))
        .clock(clock)
        .build()
        .expect("valid options");

    let log = Arc::new(CommitLog::open(factory, options).expect("open"));

    let writers: Vec<_> = (0..3u64)
        .map(|i| {
            let log = log.clone();
            std::thread::spawn(move || log.write(SeriesId(i), sample(0, 0.0), TimeUnit::Nanoseconds, &b""[..]))
        })
        .collect();

    // A `Write` event only ever gets recorded after the WriterLoop has
    // already registered that item's completion in `PendingFlushFns`, so
    // waiting for all three proves every offer landed before `Close`
    // starts tearing the queue down -- a blind sleep would race the
    // thread spawns above.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while events.lock().unwrap().len() < 3 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(events.lock().unwrap().len(), 3, "writes never reached the WriterLoop");

    log.close().expect("close");

    for handle in writers {
        let result = handle.join().expect("writer thread panicked");
        assert!(result.is_ok(), "expected a drained ack, got {result:?}");
    }

    let after_close = log.write(SeriesId(99), sample(0, 0.0), TimeUnit::Nanoseconds, &b""[..]);
    assert!(matches!(after_close, Err(CommitLogError::Closed)));
}

/// S6 — open failure is fatal: a rotation whose `Open` call fails routes
/// exactly one call to the fatal-failure handler.
#[test]
fn failed_rotation_open_invokes_the_fatal_handler_once() {
    let factory = RecordingBlockWriterFactory::new().failing_open_on_call(2);
    let clock = Arc::new(ManualClock::new(0));
    let fatal_calls: Arc<Mutex<Vec<FatalError>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = fatal_calls.clone();

    let options = OptionsBuilder::new()
        .strategy(WriteStrategy::WriteBehind)
        .backlog_queue_size(4)
        .block_size(Duration::from_nanos(1000))
        .clock(clock.clone())
        .fatal_handler(Arc::new(move |err| recorded.lock().unwrap().push(err)))
        .build()
        .expect("valid options");

    let log = CommitLog::open(factory, options).expect("open");
    clock.advance(1500);
    log.write(SeriesId(1), sample(1500, 1.0), TimeUnit::Nanoseconds, &b""[..])
        .expect("queued");

    log.close().expect("close");

    let calls = fatal_calls.lock().unwrap();
    assert_eq!(calls.len(), 1, "expected exactly one fatal call, got {}", calls.len());
    assert_eq!(calls[0].kind, commitlog::FatalErrorKind::Open);
}

/// `ActiveLogs` reflects the currently open file across a write, and fails
/// with `Closed` once the engine has been torn down.
#[test]
fn active_logs_tracks_the_open_file_and_fails_once_closed() {
    let factory = RecordingBlockWriterFactory::new();
    let options = OptionsBuilder::new()
        .strategy(WriteStrategy::WriteWait)
        .backlog_queue_size(4)
        .block_size(Duration::from_secs(3600))
        .build()
        .expect("valid options");

    let log = CommitLog::open(factory, options).expect("open");

    let before = log.active_logs().expect("active logs before write");
    assert_eq!(before.len(), 1, "the initial block's file should already be active");

    log.write(SeriesId(1), sample(0, 1.0), TimeUnit::Nanoseconds, &b""[..])
        .expect("write");

    let after_write = log.active_logs().expect("active logs after write");
    assert_eq!(after_write, before, "a write within the same block keeps the same active file");

    log.close().expect("close");

    assert!(matches!(log.active_logs(), Err(CommitLogError::Closed)));
}

/// `Close` is idempotent -- two sequential calls both succeed, and the
/// second does no further work.
#[test]
fn close_is_idempotent() {
    let factory = RecordingBlockWriterFactory::new();
    let options = OptionsBuilder::new()
        .backlog_queue_size(4)
        .block_size(Duration::from_secs(3600))
        .build()
        .expect("valid options");

    let log = CommitLog::open(factory, options).expect("open");

    assert!(log.close().is_ok());
    assert!(log.close().is_ok(), "a second close must also succeed, as a no-op");
}

/// A single producer issuing many items in order has those items observed
/// by the `BlockWriter` in that same order.
#[test]
fn single_producer_writes_are_delivered_in_fifo_order() {
    let factory = RecordingBlockWriterFactory::new();
    let events = factory.events();
    let options = OptionsBuilder::new()
        .strategy(WriteStrategy::WriteWait)
        .backlog_queue_size(4)
        .block_size(Duration::from_secs(3600))
        .build()
        .expect("valid options");

    let log = CommitLog::open(factory, options).expect("open");

    const COUNT: u64 = 20;
    for i in 0..COUNT {
        log.write(SeriesId(i), sample(i as i64, i as f64), TimeUnit::Nanoseconds, &b""[..])
            .unwrap_or_else(|err| panic!("write {i} failed: {err}"));
    }

    log.close().expect("close");

    let observed: Vec<u64> = events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|event| match event {
            RecordedEvent::Write { series, .. } => Some(series.0),
            _ => None,
        })
        .collect();
    let expected: Vec<u64> = (0..COUNT).collect();
    assert_eq!(observed, expected, "the block writer must see items in enqueue order");
}
