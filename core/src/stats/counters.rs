//! Lock-free additive counters

use std::sync::atomic::{AtomicU64, Ordering};

/// A 64-bit additive accumulator safe for many concurrent incrementers.
///
/// Increments are relaxed atomics; readers see an eventually consistent
/// value, which is all the period snapshots need.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Create a counter at zero.
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increment by one.
    #[inline]
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment by `n`.
    #[inline]
    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    /// Current value.
    pub fn sum(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Atomically read the current value and reset to zero.
    pub fn sum_then_reset(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }

    /// Reset to zero, discarding the value.
    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

/// The full counter set tracked by a worker.
///
/// The six session counters are drained by every period snapshot. The three
/// `total_*` counters accumulate for the whole test and reset only when the
/// test is stopped.
#[derive(Debug, Default)]
pub struct WorkerCounters {
    /// Messages acknowledged this interval.
    pub messages_sent: Counter,
    /// Payload bytes acknowledged this interval.
    pub bytes_sent: Counter,
    /// Failed sends this interval.
    pub errors: Counter,
    /// Poll/delivery errors this interval.
    pub poll_errors: Counter,
    /// Messages received this interval.
    pub messages_received: Counter,
    /// Payload bytes received this interval.
    pub bytes_received: Counter,
    /// Messages acknowledged since the test started.
    pub total_messages_sent: Counter,
    /// Failed sends since the test started.
    pub total_errors: Counter,
    /// Messages received since the test started.
    pub total_messages_received: Counter,
}

impl WorkerCounters {
    /// Zero the six per-interval session counters.
    pub fn reset_session(&self) {
        self.messages_sent.reset();
        self.bytes_sent.reset();
        self.errors.reset();
        self.poll_errors.reset();
        self.messages_received.reset();
        self.bytes_received.reset();
    }

    /// Zero every counter, totals included.
    pub fn reset_all(&self) {
        self.reset_session();
        self.total_messages_sent.reset();
        self.total_errors.reset();
        self.total_messages_received.reset();
    }
}
