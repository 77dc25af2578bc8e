//! Common time helpers for blinds_core.

use std::time::{Duration, Instant};

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: f64 = 1_000.0;

/// Convert fractional milliseconds to a `Duration`.
/// Negative and non-finite inputs map to zero.
#[inline]
pub fn ms_to_duration(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_secs_f64(ms / MILLIS_PER_SEC)
    } else {
        Duration::ZERO
    }
}

/// Fractional milliseconds from `epoch` to `now`, saturating at 0.
#[inline]
pub fn ms_between(epoch: Instant, now: Instant) -> f64 {
    now.saturating_duration_since(epoch).as_secs_f64() * MILLIS_PER_SEC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ms_to_duration_handles_bad_input() {
        assert_eq!(ms_to_duration(-5.0), Duration::ZERO);
        assert_eq!(ms_to_duration(f64::NAN), Duration::ZERO);
        assert_eq!(ms_to_duration(1500.0), Duration::from_millis(1500));
    }

    #[test]
    fn ms_between_saturates() {
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(250);
        assert_eq!(ms_between(t0, t1), 250.0);
        assert_eq!(ms_between(t1, t0), 0.0);
    }
}
