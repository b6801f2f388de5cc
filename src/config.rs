//! Options consumed by the commit log core.
//!
//! A fluent builder: setters return `Self`, and `build()` validates before
//! handing back an immutable `Options`.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::fatal::{default_fatal_handler, FatalHandler};

/// Which write strategy `CommitLog::write` uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStrategy {
    /// Caller waits for the write's enclosing flush boundary to complete.
    WriteWait,
    /// Caller returns as soon as the item is accepted onto the queue.
    WriteBehind,
}

/// Metrics namespace. All counters/gauges are emitted as `{metric_scope}.*`.
#[derive(Debug, Clone)]
pub struct InstrumentOptions {
    pub metric_scope: String,
}

impl Default for InstrumentOptions {
    fn default() -> Self {
        Self {
            metric_scope: "commitlog".to_string(),
        }
    }
}

/// Validated configuration for [`crate::engine::CommitLog::open`].
#[derive(Clone)]
pub struct Options {
    pub(crate) strategy: WriteStrategy,
    pub(crate) backlog_queue_size: usize,
    pub(crate) block_size: Duration,
    pub(crate) flush_interval: Duration,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) instrument: InstrumentOptions,
    pub(crate) fatal_handler: FatalHandler,
}

/// Errors from [`OptionsBuilder::build`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("backlog queue size must be greater than zero")]
    InvalidBacklogQueueSize,
    #[error("block size must be greater than zero")]
    InvalidBlockSize,
}

/// Fluent builder for [`Options`].
pub struct OptionsBuilder {
    strategy: WriteStrategy,
    backlog_queue_size: usize,
    block_size: Duration,
    flush_interval: Duration,
    clock: Arc<dyn Clock>,
    instrument: InstrumentOptions,
    fatal_handler: Option<FatalHandler>,
}

impl Default for OptionsBuilder {
    fn default() -> Self {
        Self {
            strategy: WriteStrategy::WriteWait,
            backlog_queue_size: 1024,
            block_size: Duration::from_secs(2 * 60 * 60),
            flush_interval: Duration::ZERO,
            clock: Arc::new(SystemClock),
            instrument: InstrumentOptions::default(),
            fatal_handler: None,
        }
    }
}

impl OptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strategy(mut self, strategy: WriteStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn backlog_queue_size(mut self, size: usize) -> Self {
        self.backlog_queue_size = size;
        self
    }

    pub fn block_size(mut self, size: Duration) -> Self {
        self.block_size = size;
        self
    }

    /// Set the Flusher's period. `Duration::ZERO` disables the Flusher.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn metric_scope(mut self, scope: impl Into<String>) -> Self {
        self.instrument.metric_scope = scope.into();
        self
    }

    pub fn fatal_handler(mut self, handler: FatalHandler) -> Self {
        self.fatal_handler = Some(handler);
        self
    }

    pub fn build(self) -> Result<Options, ConfigError> {
        if self.backlog_queue_size == 0 {
            return Err(ConfigError::InvalidBacklogQueueSize);
        }
        if self.block_size.is_zero() {
            return Err(ConfigError::InvalidBlockSize);
        }
        Ok(Options {
            strategy: self.strategy,
            backlog_queue_size: self.backlog_queue_size,
            block_size: self.block_size,
            flush_interval: self.flush_interval,
            clock: self.clock,
            instrument: self.instrument,
            fatal_handler: self.fatal_handler.unwrap_or_else(default_fatal_handler),
        })
    }
}
