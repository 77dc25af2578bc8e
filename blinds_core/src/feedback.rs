//! Reconciling the estimate against percentage feedback.
//!
//! Devices either expose an independent percent-state readback, which is
//! taken as authoritative, or only echo the last percent-control value,
//! which arrives in bursts while the covering moves and is debounced.
//! Both report the inverted scale: `p` percent means position `100 - p`.

use crate::estimator::{Estimate, Motion, reported};
use crate::profile::{OPEN, TravelProfile};
use crate::transition::{Effect, Transition, Update};

/// Which feedback data-point the session trusts, fixed at session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackMode {
    PercentState,
    PercentControl,
}

impl FeedbackMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackMode::PercentState => "percent_state",
            FeedbackMode::PercentControl => "percent_control",
        }
    }
}

/// Position implied by a percentage reading.
#[inline]
pub fn position_from_percent(p: f64, travel: &TravelProfile) -> f64 {
    (OPEN - p).clamp(travel.min_position(), OPEN)
}

/// Percent-state reading `p`. Returns `None` when the reading is ignored:
/// a literal 0 is skipped unless `zero_is_valid`.
pub fn on_percent_state(
    est: Estimate,
    p: f64,
    zero_is_valid: bool,
    travel: &TravelProfile,
) -> Option<Transition> {
    if p == 0.0 && !zero_is_valid {
        tracing::debug!(motion = %est.motion, "percent state 0 ignored");
        return None;
    }
    let position = position_from_percent(p, travel);
    let shown = reported(position);
    tracing::debug!(percent = p, position, "position corrected from percent state");
    Some(
        Transition::new(Estimate::stopped_at(position))
            .with(Effect::CancelCompletion)
            .publish(Update::CurrentPosition(shown))
            .publish(Update::TargetPosition(shown))
            .publish(Update::PositionState(Motion::Stopped)),
    )
}

/// Percent-control echo `p`. The position follows immediately; motion only
/// settles once the echo has been quiet for `debounce_ms`.
pub fn on_percent_control(
    est: Estimate,
    p: f64,
    debounce_ms: u64,
    travel: &TravelProfile,
) -> Transition {
    let position = position_from_percent(p, travel);
    tracing::debug!(
        percent = p,
        pending_target = ?est.target,
        position,
        "percent control echo"
    );
    let mut t = Transition::new(Estimate { position, ..est })
        .publish(Update::CurrentPosition(reported(position)));
    if let Some(target) = est.target {
        t = t.publish(Update::TargetPosition(target));
    }
    t.with(Effect::ArmDebounce {
        after_ms: debounce_ms as f64,
        settled: position,
    })
}

/// Debounce expired without another echo.
pub fn settle(est: Estimate, settled: f64) -> Transition {
    tracing::debug!(position = settled, "percent control settled");
    Transition::new(Estimate {
        motion: Motion::Stopped,
        change_time_ms: None,
        target: None,
        ..est
    })
    .publish(Update::PositionState(Motion::Stopped))
    .publish(Update::TargetPosition(reported(settled)))
}
