//! Movement state machine driven by the device's action data-point.
//!
//! An action notification is either caused by something outside this session
//! (wall switch, vendor app) or is the echo of a command the session sent
//! itself. Only the former re-baselines the estimate and arms a completion.

use crate::estimator::{Estimate, Motion, backdate, reported};
use crate::profile::{CLOSED, CommandTokens, OPEN, TravelProfile};
use crate::transition::{Effect, Transition, Update};

/// A recognised value of the action data-point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Open,
    Close,
    Stop,
}

impl Action {
    /// Map a raw token onto an action; unknown tokens yield `None`.
    pub fn from_token(token: &str, tokens: &CommandTokens) -> Option<Self> {
        if token == tokens.open {
            Some(Action::Open)
        } else if token == tokens.close {
            Some(Action::Close)
        } else if token == tokens.stop {
            Some(Action::Stop)
        } else {
            None
        }
    }
}

/// React to an action notification observed at `now_ms`.
pub fn on_action(est: Estimate, action: Action, travel: &TravelProfile, now_ms: f64) -> Transition {
    match action {
        Action::Open => start_motion(est, Motion::Opening, travel, now_ms),
        Action::Close => start_motion(est, Motion::Closing, travel, now_ms),
        Action::Stop => stop(est, travel, now_ms),
    }
}

fn start_motion(est: Estimate, motion: Motion, travel: &TravelProfile, now_ms: f64) -> Transition {
    let limit_target = match motion {
        Motion::Closing => 0u8,
        _ => 100u8,
    };

    // A different outstanding target means this is the echo of our own
    // percent-control move; the reconciler already set the baseline.
    if est.target.is_some_and(|t| t != limit_target) {
        return Transition::new(Estimate { motion, ..est }).publish(Update::PositionState(motion));
    }

    // a repeated or reversing notification continues from where the covering is now
    let position = est.projected(travel, now_ms);
    let (remaining, settle_at) = match motion {
        Motion::Closing => (position - CLOSED, travel.min_position()),
        _ => (position - OPEN, OPEN),
    };
    let after_ms = travel.travel_ms(remaining);
    let next = Estimate {
        position,
        motion,
        change_time_ms: Some(backdate(motion, position, now_ms, travel)),
        target: None,
    };
    tracing::debug!(%motion, position, after_ms, "external move; completion armed");
    Transition::new(next)
        .publish(Update::PositionState(motion))
        .with(Effect::CancelCompletion)
        .with(Effect::ArmCompletion { after_ms, settle_at })
}

fn stop(est: Estimate, travel: &TravelProfile, now_ms: f64) -> Transition {
    let position = est.projected(travel, now_ms);
    let shown = reported(position);
    tracing::debug!(
        started_ms = ?est.change_time_ms,
        now_ms,
        position,
        shown,
        "stopped mid-travel"
    );
    Transition::new(Estimate::stopped_at(position))
        .with(Effect::CancelCompletion)
        .publish(Update::CurrentPosition(shown))
        .publish(Update::TargetPosition(shown))
        .publish(Update::PositionState(Motion::Stopped))
}

/// Completion timer fired: the covering is assumed to have reached `settle_at`.
pub fn complete(settle_at: f64) -> Transition {
    tracing::debug!(position = settle_at, "travel time elapsed; marking settled");
    Transition::new(Estimate::stopped_at(settle_at))
        .publish(Update::CurrentPosition(reported(settle_at)))
        .publish(Update::PositionState(Motion::Stopped))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn travel() -> TravelProfile {
        TravelProfile::new(Some(45), None)
    }

    #[test]
    fn unknown_tokens_are_not_actions() {
        let t = CommandTokens::default();
        assert_eq!(Action::from_token("open", &t), Some(Action::Open));
        assert_eq!(Action::from_token("halt", &t), None);
    }

    #[test]
    fn external_open_arms_completion_for_remaining_travel() {
        let est = Estimate::stopped_at(40.0);
        let t = on_action(est, Action::Open, &travel(), 100_000.0);
        assert_eq!(t.estimate.motion, Motion::Opening);
        assert_eq!(t.estimate.target, None);
        assert!(t.effects.contains(&Effect::ArmCompletion {
            after_ms: 27_000.0,
            settle_at: 100.0
        }));
        // continues from 40, not from the floor
        assert!((t.estimate.projected(&travel(), 100_000.0) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn reversal_continues_from_projection() {
        let p = travel();
        let opening = on_action(Estimate::stopped_at(0.0), Action::Open, &p, 0.0).estimate;
        let t = on_action(opening, Action::Close, &p, 9_000.0);
        assert!((t.estimate.position - 20.0).abs() < 1e-9);
        assert!((t.estimate.projected(&p, 9_000.0) - 20.0).abs() < 1e-9);
        assert!(t.effects.iter().any(|e| matches!(
            e,
            Effect::ArmCompletion { after_ms, settle_at }
                if (after_ms - 9_000.0).abs() < 1e-6 && *settle_at == 0.0
        )));
    }

    #[test]
    fn echo_of_own_move_only_changes_state() {
        let est = Estimate {
            target: Some(30),
            change_time_ms: Some(5.0),
            ..Estimate::stopped_at(80.0)
        };
        let t = on_action(est, Action::Close, &travel(), 10.0);
        assert_eq!(t.estimate.motion, Motion::Closing);
        assert_eq!(t.estimate.change_time_ms, Some(5.0));
        assert_eq!(t.estimate.target, Some(30));
        assert!(!t.effects.contains(&Effect::CancelCompletion));
    }

    #[test]
    fn stop_without_segment_keeps_position() {
        let t = on_action(Estimate::stopped_at(63.4), Action::Stop, &travel(), 0.0);
        assert_eq!(t.estimate, Estimate::stopped_at(63.4));
        assert_eq!(
            t.updates().cloned().collect::<Vec<_>>(),
            vec![
                Update::CurrentPosition(63),
                Update::TargetPosition(63),
                Update::PositionState(Motion::Stopped)
            ]
        );
    }

    #[test]
    fn completion_reports_clamped_floor() {
        let t = complete(-25.0);
        assert_eq!(t.estimate.position, -25.0);
        assert_eq!(t.updates().next(), Some(&Update::CurrentPosition(0)));
    }
}
