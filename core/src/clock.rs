//! Timestamp sources shared by the hot path.
//!
//! Intended-send and send timestamps all come from one process-wide
//! monotonic clock, so values produced by different rate limiter instances
//! stay directly comparable. End-to-end latency uses the wall clock because
//! publish timestamps are stamped on other machines.

use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

fn epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

/// Nanoseconds elapsed on the process-wide monotonic clock.
#[inline]
pub fn now_nanos() -> u64 {
    epoch().elapsed().as_nanos() as u64
}

/// Wall-clock nanoseconds since the Unix epoch.
///
/// Signed so that callers can subtract timestamps taken on hosts with
/// skewed clocks without wrapping.
#[inline]
pub fn wall_nanos() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_nanos() as i64,
        Err(e) => -(e.duration().as_nanos() as i64),
    }
}

/// Wall-clock milliseconds since the Unix epoch, the unit publish
/// timestamps travel in.
#[inline]
pub fn wall_millis() -> i64 {
    wall_nanos() / 1_000_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_clock_is_nondecreasing() {
        let a = now_nanos();
        let b = now_nanos();
        assert!(b >= a);
    }

    #[test]
    fn wall_clock_is_after_unix_epoch() {
        assert!(wall_nanos() > 0);
        assert!(wall_millis() > 0);
    }

    #[test]
    fn wall_units_agree() {
        let ns = wall_nanos();
        let ms = wall_millis();
        assert!((ns / 1_000_000 - ms).abs() < 10);
    }
}
