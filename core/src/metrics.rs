//! External metrics sink abstraction
//!
//! The worker mirrors its cumulative counters and latency observations into
//! a hierarchical sink so deployments can bridge them into whatever metrics
//! system they run. The default sink discards everything; the core never
//! depends on a concrete backend.

use std::sync::Arc;
use std::time::Duration;

/// A hierarchical metrics namespace.
pub trait MetricsSink: Send + Sync {
    /// Child sink scoped under `name`.
    fn scope(&self, name: &str) -> Arc<dyn MetricsSink>;

    /// Monotonic counter registered under `name`.
    fn counter(&self, name: &str) -> Arc<dyn SinkCounter>;

    /// Operation-latency stats registered under `name`.
    fn op_stats(&self, name: &str) -> Arc<dyn OpStatsSink>;
}

/// A monotonically increasing counter.
pub trait SinkCounter: Send + Sync {
    /// Increment by one.
    fn inc(&self);

    /// Increment by `n`.
    fn add(&self, n: u64);
}

/// Records latencies of successful operations.
pub trait OpStatsSink: Send + Sync {
    /// Record one successful operation and its latency.
    fn record_success(&self, latency: Duration);
}

/// Sink that discards every event; used when no sink is supplied.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn scope(&self, _name: &str) -> Arc<dyn MetricsSink> {
        Arc::new(NoopMetricsSink)
    }

    fn counter(&self, _name: &str) -> Arc<dyn SinkCounter> {
        Arc::new(NoopMetricsSink)
    }

    fn op_stats(&self, _name: &str) -> Arc<dyn OpStatsSink> {
        Arc::new(NoopMetricsSink)
    }
}

impl SinkCounter for NoopMetricsSink {
    fn inc(&self) {}

    fn add(&self, _n: u64) {}
}

impl OpStatsSink for NoopMetricsSink {
    fn record_success(&self, _latency: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_scopes_and_records() {
        let sink = NoopMetricsSink;
        let producer = sink.scope("producer");
        producer.counter("messages_sent").inc();
        producer.counter("bytes_sent").add(1024);
        producer
            .op_stats("produce_latency")
            .record_success(Duration::from_micros(250));
    }
}
