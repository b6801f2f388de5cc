//! Monotonic-ish time source used by the engine for block truncation and
//! expiry math. Injectable so tests can drive rotation deterministically.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Nanoseconds since the UNIX epoch.
pub type Timestamp = i64;

/// A source of "now", abstracted so tests can supply a manual clock instead
/// of the real system clock.
///
/// The same injectable-clock shape used for `TimeProvider`-style sources
/// elsewhere, expressed here as a trait (rather than a boxed closure)
/// because the engine needs to hand the same clock to three independent
/// threads.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The default clock, backed by [`SystemTime`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as Timestamp)
            .unwrap_or(0)
    }
}

/// Truncate `now` down to the start of its enclosing block.
///
/// `block_size` of zero is treated as "no truncation" so callers that
/// already reject a zero block size at configuration time never hit this
/// branch in practice.
pub(crate) fn truncate(now: Timestamp, block_size: Duration) -> Timestamp {
    let size = block_size.as_nanos() as i64;
    if size <= 0 {
        return now;
    }
    now - now.rem_euclid(size)
}
