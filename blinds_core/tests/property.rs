use std::sync::Arc;

use blinds_core::estimator::{Estimate, Motion, project};
use blinds_core::mocks::RecordingDevice;
use blinds_core::{BlindsSession, FeedbackCfg, TravelProfile};
use blinds_traits::{Changes, DpValue, ManualClock};
use proptest::prelude::*;

proptest! {
    #[test]
    fn opening_projection_is_monotonic_and_bounded(
        duration in 1i64..600,
        tightening in 0i64..100,
        start in -60_000.0f64..60_000.0,
        a in 0.0f64..700_000.0,
        b in 0.0f64..700_000.0,
    ) {
        let travel = TravelProfile::new(Some(duration), Some(tightening));
        let (early, late) = if a <= b { (a, b) } else { (b, a) };
        let p1 = project(Motion::Opening, start, early, &travel);
        let p2 = project(Motion::Opening, start, late, &travel);
        prop_assert!(p1 <= p2);
        for p in [p1, p2] {
            prop_assert!(p >= travel.min_position() && p <= 100.0);
        }
        let c1 = project(Motion::Closing, start, early, &travel);
        let c2 = project(Motion::Closing, start, late, &travel);
        prop_assert!(c1 >= c2);
    }

    #[test]
    fn reported_position_is_always_in_range(
        position in -1.0e6f64..1.0e6,
    ) {
        let r = Estimate::stopped_at(position).reported();
        prop_assert!(r <= 100);
    }

    #[test]
    fn target_then_percent_state_settles_on_target(
        from in 0i64..=100,
        target in 0u8..=100,
    ) {
        // Full open reads back as 0, which only counts when configured to.
        let feedback = FeedbackCfg {
            percent_state_zero_is_valid: true,
            ..FeedbackCfg::default()
        };
        let initial: Changes = [("3".to_string(), DpValue::Int(from))].into();
        let mut s = BlindsSession::builder()
            .with_device(RecordingDevice::default())
            .with_clock(Arc::new(ManualClock::new()))
            .with_feedback(feedback)
            .with_initial_state(initial)
            .build()
            .expect("session");
        s.set_target_position(target).expect("dispatch");
        prop_assert_eq!(s.device().sent.len(), 1);

        let readback: Changes =
            [("3".to_string(), DpValue::Int(100 - i64::from(target)))].into();
        s.handle_changes(&readback);
        prop_assert_eq!(s.estimate().reported(), target);
        prop_assert_eq!(s.get_position_state(), Motion::Stopped);
        prop_assert!(s.is_idle());
    }

    #[test]
    fn target_then_settled_echo_lands_on_target(
        from in 0i64..=100,
        target in 0u8..=100,
    ) {
        let clock = ManualClock::new();
        let initial: Changes = [("2".to_string(), DpValue::Int(from))].into();
        let mut s = BlindsSession::builder()
            .with_device(RecordingDevice::default())
            .with_clock(Arc::new(clock.clone()))
            .with_initial_state(initial)
            .build()
            .expect("session");
        s.set_target_position(target).expect("dispatch");
        prop_assert_eq!(s.device().sent.len(), 1);

        let echo: Changes =
            [("2".to_string(), DpValue::Int(100 - i64::from(target)))].into();
        s.handle_changes(&echo);
        clock.advance_ms(FeedbackCfg::default().debounce_ms);
        prop_assert!(s.poll_timers() >= 1);
        prop_assert_eq!(s.estimate().reported(), target);
        prop_assert_eq!(s.get_position_state(), Motion::Stopped);
        prop_assert!(s.is_idle());
    }
}

// A full-open readback of 0 is skipped by default, so the move toward 100
// stays in flight until the action or completion settles it.
#[test]
fn full_open_readback_is_skipped_by_default() {
    let initial: Changes = [("3".to_string(), DpValue::Int(50))].into();
    let mut s = BlindsSession::builder()
        .with_device(RecordingDevice::default())
        .with_clock(Arc::new(ManualClock::new()))
        .with_initial_state(initial)
        .build()
        .expect("session");
    s.set_target_position(100).expect("dispatch");

    s.handle_changes(&[("3".to_string(), DpValue::Int(0))].into());
    let est = s.estimate();
    assert_eq!(est.position, 50.0);
    assert_eq!(est.motion, Motion::Opening);
    assert_eq!(est.target, Some(100));
    assert!(!s.is_idle());
}
