//! Time-based position estimate.
//!
//! The motor never reports where it is while moving, so position is
//! reconstructed from the moment the current motion segment started
//! (`change_time_ms`) and the configured travel time. All timestamps are
//! milliseconds on the session's clock; they may be negative when a segment is
//! back-dated to before the session epoch.

use crate::profile::{OPEN, TravelProfile};

/// Movement state of the covering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Motion {
    Stopped,
    Opening,
    Closing,
}

impl Motion {
    pub fn as_str(self) -> &'static str {
        match self {
            Motion::Stopped => "stopped",
            Motion::Opening => "opening",
            Motion::Closing => "closing",
        }
    }
}

impl std::fmt::Display for Motion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable snapshot of what the session believes about the covering.
///
/// `position` is kept unrounded and may sit inside the tightening band
/// (below 0); use [`Estimate::reported`] for anything shown outside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub position: f64,
    pub motion: Motion,
    pub change_time_ms: Option<f64>,
    pub target: Option<u8>,
}

impl Estimate {
    /// Initial estimate: fully open unless the last known action was a close.
    pub fn seeded(travel: &TravelProfile, last_action_was_close: bool) -> Self {
        let position = if last_action_was_close {
            travel.min_position()
        } else {
            OPEN
        };
        Self::stopped_at(position)
    }

    /// A stationary estimate; no segment start and no outstanding target.
    pub fn stopped_at(position: f64) -> Self {
        Self {
            position,
            motion: Motion::Stopped,
            change_time_ms: None,
            target: None,
        }
    }

    /// Position at `now_ms`, projected from elapsed time while a segment is
    /// running; the stored position otherwise.
    pub fn projected(&self, travel: &TravelProfile, now_ms: f64) -> f64 {
        match self.change_time_ms {
            Some(start) if self.motion != Motion::Stopped => {
                project(self.motion, start, now_ms, travel)
            }
            _ => self.position,
        }
    }

    /// Externally visible position.
    #[inline]
    pub fn reported(&self) -> u8 {
        reported(self.position)
    }
}

/// Fraction of a full traverse (in position units) driven since `change_time_ms`.
#[inline]
pub fn disposition(now_ms: f64, change_time_ms: f64, travel: &TravelProfile) -> f64 {
    (now_ms - change_time_ms) / travel.ms_per_unit()
}

/// Position implied by a segment that started at `change_time_ms`.
///
/// Closing counts down from fully open, opening counts up from the logical
/// floor; the result never leaves `[min_position, 100]`.
pub fn project(motion: Motion, change_time_ms: f64, now_ms: f64, travel: &TravelProfile) -> f64 {
    let d = disposition(now_ms, change_time_ms, travel);
    let p = match motion {
        Motion::Closing => OPEN - d,
        _ => travel.min_position() + d,
    };
    p.clamp(travel.min_position(), OPEN)
}

/// Segment start that makes [`project`] continue from `position` right now.
pub fn backdate(motion: Motion, position: f64, now_ms: f64, travel: &TravelProfile) -> f64 {
    let travelled = match motion {
        Motion::Closing => OPEN - position,
        _ => position - travel.min_position(),
    };
    now_ms - travel.travel_ms(travelled)
}

/// `max(0, round(position))`, capped at fully open.
#[inline]
pub fn reported(position: f64) -> u8 {
    if !position.is_finite() {
        return 0;
    }
    // JS-style rounding: halves go toward +inf
    (position + 0.5).floor().clamp(0.0, OPEN) as u8
}
