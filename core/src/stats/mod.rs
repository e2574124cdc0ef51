//! Statistics primitives and the snapshot types served to a coordinator
//!
//! Counters and recorders live for the whole worker lifetime and are reset
//! explicitly; the snapshot structs here are produced on demand by the
//! worker's stats endpoints.

mod counters;
mod recorder;

pub use counters::{Counter, WorkerCounters};
pub use recorder::{
    LatencyRecorder, LatencyTracker, END_TO_END_MAX_MICROS, PRODUCER_MAX_MICROS,
    SIGNIFICANT_DIGITS,
};

use hdrhistogram::Histogram;

/// One interval's worth of statistics.
///
/// Counts are drained from the session counters (reset on read); the
/// `total_*` fields are read without resetting. The histograms hold exactly
/// the latencies recorded since the previous period snapshot, in
/// microseconds.
#[derive(Clone)]
pub struct PeriodStats {
    /// Messages acknowledged this interval.
    pub messages_sent: u64,
    /// Payload bytes acknowledged this interval.
    pub bytes_sent: u64,
    /// Failed sends this interval.
    pub errors: u64,
    /// Poll/delivery errors this interval.
    pub poll_errors: u64,
    /// Messages received this interval.
    pub messages_received: u64,
    /// Payload bytes received this interval.
    pub bytes_received: u64,

    /// Messages acknowledged since the test started.
    pub total_messages_sent: u64,
    /// Failed sends since the test started.
    pub total_errors: u64,
    /// Messages received since the test started.
    pub total_messages_received: u64,

    /// Broker-acknowledgement latency for this interval.
    pub publish_latency: Histogram<u64>,
    /// Send-dispatch latency for this interval.
    pub schedule_latency: Histogram<u64>,
    /// Intended-vs-actual send-time delay for this interval.
    pub publish_delay_latency: Histogram<u64>,
    /// Consumer end-to-end latency for this interval.
    pub end_to_end_latency: Histogram<u64>,
}

/// Whole-run latency distributions, copied without clearing the recorders.
#[derive(Clone)]
pub struct CumulativeLatencies {
    /// Broker-acknowledgement latency since the last stats reset.
    pub publish_latency: Histogram<u64>,
    /// Send-dispatch latency since the last stats reset.
    pub schedule_latency: Histogram<u64>,
    /// Intended-vs-actual send-time delay since the last stats reset.
    pub publish_delay_latency: Histogram<u64>,
    /// Consumer end-to-end latency since the last stats reset.
    pub end_to_end_latency: Histogram<u64>,
}

/// Lightweight totals for liveness polling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountersStats {
    /// Messages acknowledged since the test started.
    pub messages_sent: u64,
    /// Messages received since the test started.
    pub messages_received: u64,
}
