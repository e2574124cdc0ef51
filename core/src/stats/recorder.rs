//! High-dynamic-range latency recorders
//!
//! A [`LatencyRecorder`] shards one logical histogram across per-thread
//! mutexes: each recording thread is assigned its own shard, so the hot
//! path locks an uncontended mutex instead of serializing all recorders on
//! a shared one. An interval snapshot swaps every shard with a fresh
//! histogram and merges the previous ones, so successive snapshots tile the
//! recorded values without gap or overlap.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hdrhistogram::Histogram;

use crate::metrics::OpStatsSink;

/// Microsecond ceiling for the producer-side recorders (60 s).
pub const PRODUCER_MAX_MICROS: u64 = 60 * 1_000_000;

/// Microsecond ceiling for the end-to-end recorder (12 h).
pub const END_TO_END_MAX_MICROS: u64 = 12 * 3_600 * 1_000_000;

/// Significant value digits kept by every recorder.
pub const SIGNIFICANT_DIGITS: u8 = 5;

/// Shards beyond this stop paying for themselves.
const MAX_SHARDS: usize = 8;

/// Stable per-thread slot used to pick a shard.
fn shard_index(shards: usize) -> usize {
    use std::cell::Cell;

    static NEXT_SLOT: AtomicUsize = AtomicUsize::new(0);
    thread_local! {
        static SLOT: Cell<usize> = const { Cell::new(usize::MAX) };
    }

    SLOT.with(|slot| {
        let mut v = slot.get();
        if v == usize::MAX {
            v = NEXT_SLOT.fetch_add(1, Ordering::Relaxed);
            slot.set(v);
        }
        v % shards
    })
}

/// A concurrent histogram with swap-on-snapshot interval semantics.
pub struct LatencyRecorder {
    shards: Box<[Mutex<Histogram<u64>>]>,
    max_value: u64,
}

impl LatencyRecorder {
    /// Create a recorder tracking values in `[0, max_value]` microseconds.
    /// Values above `max_value` are clamped into the top bucket.
    pub fn new(max_value: u64) -> Self {
        let shard_count = num_cpus::get().clamp(1, MAX_SHARDS);
        let shards = (0..shard_count)
            .map(|_| Mutex::new(fresh_histogram()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { shards, max_value }
    }

    /// Record one value into the calling thread's shard.
    #[inline]
    pub fn record(&self, value: u64) {
        let idx = shard_index(self.shards.len());
        let mut shard = self.shards[idx].lock().unwrap();
        shard.saturating_record(value.min(self.max_value));
    }

    /// Snapshot-and-clear: returns exactly the values recorded since the
    /// previous interval snapshot (or construction).
    pub fn snapshot_interval(&self) -> Histogram<u64> {
        let mut merged = fresh_histogram();
        for shard in self.shards.iter() {
            let previous = {
                let mut live = shard.lock().unwrap();
                std::mem::replace(&mut *live, fresh_histogram())
            };
            merged
                .add(&previous)
                .expect("shards share histogram configuration");
        }
        merged
    }

    /// Copy of everything currently recorded, without clearing.
    pub fn snapshot(&self) -> Histogram<u64> {
        let mut merged = fresh_histogram();
        for shard in self.shards.iter() {
            let live = shard.lock().unwrap();
            merged
                .add(&*live)
                .expect("shards share histogram configuration");
        }
        merged
    }

    /// Discard all recorded values.
    pub fn reset(&self) {
        for shard in self.shards.iter() {
            shard.lock().unwrap().reset();
        }
    }
}

fn fresh_histogram() -> Histogram<u64> {
    // Auto-resizing keeps idle recorders small even at 5 significant
    // digits; storage grows only to the range actually observed.
    Histogram::new(SIGNIFICANT_DIGITS).expect("valid histogram precision")
}

/// One latency metric: an interval recorder, a cumulative recorder, and the
/// external sink feed, all updated by a single `record_micros` call.
pub struct LatencyTracker {
    interval: LatencyRecorder,
    cumulative: LatencyRecorder,
    sink: Arc<dyn OpStatsSink>,
}

impl LatencyTracker {
    /// Create a tracker whose recorders clamp at `max_micros`.
    pub fn new(max_micros: u64, sink: Arc<dyn OpStatsSink>) -> Self {
        Self {
            interval: LatencyRecorder::new(max_micros),
            cumulative: LatencyRecorder::new(max_micros),
            sink,
        }
    }

    /// Record one observation, in microseconds.
    #[inline]
    pub fn record_micros(&self, micros: u64) {
        self.interval.record(micros);
        self.cumulative.record(micros);
        self.sink.record_success(Duration::from_micros(micros));
    }

    /// Drain the interval recorder.
    pub fn interval_histogram(&self) -> Histogram<u64> {
        self.interval.snapshot_interval()
    }

    /// Copy the cumulative recorder without clearing it.
    pub fn cumulative_histogram(&self) -> Histogram<u64> {
        self.cumulative.snapshot()
    }

    /// Clear both recorders.
    pub fn reset(&self) {
        self.interval.reset();
        self.cumulative.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::NoopMetricsSink;

    #[test]
    fn interval_snapshots_tile() {
        let recorder = LatencyRecorder::new(PRODUCER_MAX_MICROS);
        for v in 1..=10 {
            recorder.record(v * 100);
        }

        let first = recorder.snapshot_interval();
        assert_eq!(first.len(), 10);

        let second = recorder.snapshot_interval();
        assert_eq!(second.len(), 0);

        recorder.record(42);
        let third = recorder.snapshot_interval();
        assert_eq!(third.len(), 1);
    }

    #[test]
    fn cumulative_snapshot_does_not_clear() {
        let recorder = LatencyRecorder::new(PRODUCER_MAX_MICROS);
        recorder.record(500);
        recorder.record(900);

        assert_eq!(recorder.snapshot().len(), 2);
        assert_eq!(recorder.snapshot().len(), 2);

        recorder.reset();
        assert_eq!(recorder.snapshot().len(), 0);
    }

    #[test]
    fn values_above_max_clamp_into_top_bucket() {
        let recorder = LatencyRecorder::new(1_000);
        recorder.record(u64::MAX);
        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.max() <= 1_000);
    }

    #[test]
    fn zero_is_recordable() {
        let recorder = LatencyRecorder::new(1_000);
        recorder.record(0);
        assert_eq!(recorder.snapshot().len(), 1);
    }

    #[test]
    fn concurrent_recording_keeps_every_sample() {
        let recorder = std::sync::Arc::new(LatencyRecorder::new(PRODUCER_MAX_MICROS));
        let mut handles = Vec::new();
        for t in 0..4 {
            let recorder = std::sync::Arc::clone(&recorder);
            handles.push(std::thread::spawn(move || {
                for i in 0..5_000u64 {
                    recorder.record(t * 10_000 + i);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(recorder.snapshot().len(), 20_000);
    }

    #[test]
    fn tracker_feeds_interval_and_cumulative() {
        let tracker = LatencyTracker::new(
            PRODUCER_MAX_MICROS,
            std::sync::Arc::new(NoopMetricsSink),
        );
        tracker.record_micros(250);
        tracker.record_micros(750);

        assert_eq!(tracker.interval_histogram().len(), 2);
        // The interval side is now drained; the cumulative side is not.
        assert_eq!(tracker.interval_histogram().len(), 0);
        assert_eq!(tracker.cumulative_histogram().len(), 2);

        tracker.reset();
        assert_eq!(tracker.cumulative_histogram().len(), 0);
    }
}
