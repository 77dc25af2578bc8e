//! Turns a requested target position into exactly one device command.

use blinds_traits::DpValue;

use crate::estimator::{Estimate, Motion, backdate};
use crate::profile::DeviceProfile;
use crate::transition::{Command, Effect, Transition, Update};

/// Closer than this to the target and the covering is told to stop instead.
pub const ARRIVED_EPSILON: f64 = 1.0;

/// Plan a move to `value` (0 closed .. 100 open; larger values are capped).
///
/// The estimate is first brought up to date from elapsed time so a target
/// arriving mid-motion overrides the running segment instead of being
/// judged against a stale position.
pub fn set_target(est: Estimate, value: u8, profile: &DeviceProfile, now_ms: f64) -> Transition {
    let travel = &profile.travel;
    let value = value.min(100);
    let position = est.projected(travel, now_ms);
    let goal = f64::from(value);

    tracing::debug!(
        from = position,
        to = value,
        motion = %est.motion,
        "target requested"
    );

    if (goal - position).abs() < ARRIVED_EPSILON {
        let stop = Command::new(&profile.dps.action, profile.tokens.stop.as_str());
        // Stopped estimates never carry a target; the stop echo clears it
        // for moving ones.
        let target = (est.motion != Motion::Stopped).then_some(value);
        return Transition::new(Estimate {
            position,
            target,
            ..est
        })
        .with(Effect::CancelCompletion)
        .with(Effect::Dispatch(stop));
    }

    let motion = if goal > position {
        Motion::Opening
    } else {
        Motion::Closing
    };
    let control = Command::new(
        &profile.dps.percent_control,
        DpValue::Int(100 - i64::from(value)),
    );
    let next = Estimate {
        position,
        motion,
        change_time_ms: Some(backdate(motion, position, now_ms, travel)),
        target: Some(value),
    };
    // A debounce left over from the previous move would settle this one early.
    let mut t = Transition::new(next)
        .with(Effect::CancelCompletion)
        .with(Effect::CancelDebounce)
        .with(Effect::Dispatch(control));
    if est.motion != motion {
        t = t.publish(Update::PositionState(motion));
    }
    t
}
