//! Single-slot timers.
//!
//! The session owns one slot per purpose. Arming replaces whatever was armed,
//! and cancelling an empty or already-fired slot is a no-op.

use std::time::Instant;

#[derive(Debug)]
pub struct TimerSlot<T> {
    armed: Option<(Instant, T)>,
}

impl<T> Default for TimerSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerSlot<T> {
    pub const fn new() -> Self {
        Self { armed: None }
    }

    /// Arm for `deadline`, replacing any pending event. Returns true if one was replaced.
    pub fn arm(&mut self, deadline: Instant, payload: T) -> bool {
        self.armed.replace((deadline, payload)).is_some()
    }

    /// Drop the pending event, if any. Returns true if one was pending.
    pub fn cancel(&mut self) -> bool {
        self.armed.take().is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed.as_ref().map(|(d, _)| *d)
    }

    /// Disarm and return the payload if the deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<T> {
        match &self.armed {
            Some((deadline, _)) if *deadline <= now => self.armed.take().map(|(_, p)| p),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn arm_replaces_pending_event() {
        let t0 = Instant::now();
        let mut slot = TimerSlot::new();
        assert!(!slot.arm(t0 + Duration::from_millis(10), 1));
        assert!(slot.arm(t0 + Duration::from_millis(20), 2));
        assert_eq!(slot.take_due(t0 + Duration::from_millis(15)), None);
        assert_eq!(slot.take_due(t0 + Duration::from_millis(20)), Some(2));
        assert!(!slot.is_armed());
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut slot: TimerSlot<()> = TimerSlot::new();
        assert!(!slot.cancel());
        slot.arm(Instant::now(), ());
        assert!(slot.cancel());
        assert!(!slot.cancel());
        assert_eq!(slot.deadline(), None);
    }
}
