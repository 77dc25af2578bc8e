//! Hand-written TOML tables resolved into core types.

use std::sync::Arc;

use blinds_core::mocks::RecordingDevice;
use blinds_core::{BlindsSession, Command, DeviceProfile, FeedbackCfg, Motion, RunnerCfg};
use blinds_traits::{Changes, DpValue, ManualClock};

fn parse(text: &str) -> blinds_config::Config {
    toml::from_str(text).expect("toml")
}

#[test]
fn loose_device_table_resolves_to_profile() {
    let cfg = parse(
        r#"
[device]
name = "bedroom"
dp_action = 101
dp_percent_control = "102"
time_to_open = "50"
time_to_tighten = 10.9
cmd_open = " up "
cmd_close = "down"
flip_state = "true"
"#,
    );
    let p = DeviceProfile::from(&cfg.device);
    assert_eq!(p.name.as_deref(), Some("bedroom"));
    assert_eq!(p.travel.duration_s(), 50);
    assert_eq!(p.travel.tightening_s(), 10);
    assert_eq!(p.travel.min_position(), -25.0);
    assert_eq!(p.tokens.open, "down");
    assert_eq!(p.tokens.close, "up");
    assert_eq!(p.tokens.stop, "stop");
    assert_eq!(p.dps.action, "101");
    assert_eq!(p.dps.percent_control, "102");
    assert_eq!(p.dps.percent_state, "3");
}

#[test]
fn unusable_device_values_fall_back() {
    let cfg = parse(
        r#"
[device]
time_to_open = "slow"
time_to_tighten = 90
dp_action = true
cmd_stop = ""
"#,
    );
    let p = DeviceProfile::from(&cfg.device);
    assert_eq!(p, DeviceProfile::from(&blinds_config::DeviceCfg::default()));
    assert_eq!(p.travel.duration_s(), 45);
    assert_eq!(p.travel.min_position(), 0.0);
}

#[test]
fn tunables_carry_over() {
    let cfg = parse(
        r#"
[feedback]
debounce_ms = 400
percent_state_zero_is_valid = true

[runner]
max_run_ms = 9000
idle_ms = 20
"#,
    );
    let fb = FeedbackCfg::from(&cfg.feedback);
    assert_eq!(
        fb,
        FeedbackCfg {
            debounce_ms: 400,
            percent_state_zero_is_valid: true,
        }
    );
    let runner = RunnerCfg::from(&cfg.runner);
    assert_eq!(runner.max_run_ms, 9000);
    assert_eq!(runner.idle_ms, 20);
}

#[test]
fn session_follows_configured_data_points() {
    let cfg = parse(
        r#"
[device]
dp_action = "7"
dp_percent_state = "9"
"#,
    );
    let initial: Changes = [
        ("7".to_string(), DpValue::from("stop")),
        ("9".to_string(), DpValue::Int(30)),
    ]
    .into();
    let mut s = BlindsSession::builder()
        .with_device(RecordingDevice::default())
        .with_clock(Arc::new(ManualClock::new()))
        .with_profile(DeviceProfile::from(&cfg.device))
        .with_feedback((&cfg.feedback).into())
        .with_initial_state(initial)
        .build()
        .expect("session");
    assert_eq!(s.estimate().reported(), 70);

    s.set_target_position(20).expect("dispatch");
    assert_eq!(s.get_position_state(), Motion::Closing);
    assert_eq!(s.device().sent, vec![Command::new("2", DpValue::Int(80))]);
}
