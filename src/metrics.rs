//! Opaque counters and gauges surfaced to the host process.
//!
//! Built on the `metrics` crate's `counter!`/`gauge!` macros, the same way
//! a disk-backed buffer or queue elsewhere instruments its own throughput
//! and backlog. Every name is namespaced under the configured scope
//! (default `commitlog`).

use crate::config::InstrumentOptions;

pub(crate) struct Metrics {
    scope: String,
}

impl Metrics {
    pub(crate) fn new(options: &InstrumentOptions) -> Self {
        Self {
            scope: options.metric_scope.clone(),
        }
    }

    fn name(&self, suffix: &str) -> String {
        format!("{}.{suffix}", self.scope)
    }

    pub(crate) fn set_queue_depth(&self, depth: i64) {
        metrics::gauge!(self.name("writes.queued")).set(depth as f64);
    }

    pub(crate) fn set_queue_capacity(&self, capacity: i64) {
        metrics::gauge!(self.name("writes.queue-capacity")).set(capacity as f64);
    }

    pub(crate) fn inc_success(&self) {
        metrics::counter!(self.name("writes.success")).increment(1);
    }

    pub(crate) fn inc_errors(&self) {
        metrics::counter!(self.name("writes.errors")).increment(1);
    }

    pub(crate) fn inc_open_errors(&self) {
        metrics::counter!(self.name("writes.open-errors")).increment(1);
    }

    pub(crate) fn inc_close_errors(&self) {
        metrics::counter!(self.name("writes.close-errors")).increment(1);
    }

    pub(crate) fn inc_flush_errors(&self) {
        metrics::counter!(self.name("writes.flush-errors")).increment(1);
    }

    pub(crate) fn inc_flush_done(&self) {
        metrics::counter!(self.name("writes.flush-done")).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
    use metrics_util::CompositeKey;

    fn snapshot_value(snapshotter: &Snapshotter, name: &str) -> Option<DebugValue> {
        snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .find(|(key, ..)| key_name(key) == name)
            .map(|(.., value)| value)
    }

    fn key_name(key: &CompositeKey) -> String {
        key.key().name().to_string()
    }

    #[test]
    fn counters_and_gauges_are_namespaced_under_the_configured_scope() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        metrics::with_local_recorder(&recorder, || {
            let metrics = Metrics::new(&InstrumentOptions {
                metric_scope: "testscope".into(),
            });
            metrics.inc_success();
            metrics.set_queue_depth(3);
        });

        assert!(matches!(
            snapshot_value(&snapshotter, "testscope.writes.success"),
            Some(DebugValue::Counter(1))
        ));
        assert!(snapshot_value(&snapshotter, "testscope.writes.queued").is_some());
    }
}
