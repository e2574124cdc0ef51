//! Open-loop uniform rate limiter
//!
//! `acquire` hands back the *intended* start time of the caller's operation
//! instead of blocking until it. A caller that falls behind keeps receiving
//! timestamps in the past, so the backlog shows up as measurable publish
//! delay rather than disappearing into messages that were never attempted —
//! the coordinated-omission artifact this limiter exists to defeat.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::clock;

/// Lowest operating rate; requested rates below this are clamped up.
pub const MIN_RATE: f64 = 1.0;

/// Remaining wait below this is served by spinning for sub-millisecond
/// precision.
const SPIN_THRESHOLD_NS: u64 = 1_000_000;

/// Remaining wait below the spin threshold but above this is served by
/// yielding the CPU between checks.
const YIELD_THRESHOLD_NS: u64 = 50_000;

/// Upper bound on a single coarse sleep, so a cancelled long wait is
/// noticed within a few milliseconds.
const MAX_SLEEP_NS: u64 = 2_000_000;

/// Fixed-rate limiter handing out evenly spaced intended-send timestamps.
///
/// The configuration is immutable; changing the rate means atomically
/// swapping in a new limiter, which the worker does on
/// `adjust_publish_rate`.
#[derive(Debug)]
pub struct UniformRateLimiter {
    interval_ns: u64,
    next_intended_ns: AtomicU64,
}

impl UniformRateLimiter {
    /// Create a limiter for `rate` messages per second, floored at
    /// [`MIN_RATE`]. The first intended timestamp is the moment of
    /// construction.
    pub fn new(rate: f64) -> Self {
        let rate = if rate.is_finite() && rate > MIN_RATE {
            rate
        } else {
            MIN_RATE
        };
        Self {
            interval_ns: (1e9 / rate) as u64,
            next_intended_ns: AtomicU64::new(clock::now_nanos()),
        }
    }

    /// Effective rate in messages per second.
    pub fn rate(&self) -> f64 {
        1e9 / self.interval_ns as f64
    }

    /// Claim the next send slot, returning its intended monotonic
    /// timestamp in nanoseconds.
    ///
    /// Never blocks. The caller is expected to [`sleep_until`] the returned
    /// time before starting the send.
    #[inline]
    pub fn acquire(&self) -> u64 {
        self.next_intended_ns
            .fetch_add(self.interval_ns, Ordering::Relaxed)
    }
}

/// Wait until the monotonic clock reaches `target_ns`.
///
/// Returns `false` if `stop` became true before the deadline was reached.
/// The wait is never cut short by signals: coarse sleeps are bounded and
/// re-checked, and the final stretch is served by a yield/spin phase so the
/// deadline is hit with sub-millisecond precision.
pub fn sleep_until(target_ns: u64, stop: &AtomicBool) -> bool {
    loop {
        let now = clock::now_nanos();
        if now >= target_ns {
            return true;
        }
        if stop.load(Ordering::Relaxed) {
            return false;
        }

        let remaining = target_ns - now;
        if remaining > SPIN_THRESHOLD_NS {
            let sleep_ns = (remaining - SPIN_THRESHOLD_NS).min(MAX_SLEEP_NS);
            std::thread::sleep(Duration::from_nanos(sleep_ns));
        } else if remaining > YIELD_THRESHOLD_NS {
            std::thread::yield_now();
        } else {
            std::hint::spin_loop();
        }
    }
}
