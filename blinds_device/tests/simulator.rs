use std::time::Duration;

use blinds_device::error::DeviceError;
use blinds_device::{SimSettings, SimulatedBlinds};
use blinds_traits::{Changes, Device, DpValue, MonotonicClock};
use crossbeam_channel::Receiver;
use rstest::rstest;

fn fast(start: f64) -> SimSettings {
    SimSettings {
        travel: Duration::from_millis(200),
        start_position: start,
        tick: Duration::from_millis(2),
        ..SimSettings::default()
    }
}

fn spawn(settings: SimSettings) -> (SimulatedBlinds, Receiver<Changes>) {
    SimulatedBlinds::spawn(settings, MonotonicClock::new())
}

/// Collect feed batches until `pred` matches one, or give up after `timeout`.
fn wait_for(feed: &Receiver<Changes>, timeout: Duration, pred: impl Fn(&Changes) -> bool) -> Vec<Changes> {
    let deadline = std::time::Instant::now() + timeout;
    let mut seen = Vec::new();
    while let Some(left) = deadline.checked_duration_since(std::time::Instant::now()) {
        match feed.recv_timeout(left) {
            Ok(c) => {
                let hit = pred(&c);
                seen.push(c);
                if hit {
                    break;
                }
            }
            Err(_) => break,
        }
    }
    seen
}

#[rstest]
#[case(100.0, "open", 0)]
#[case(0.0, "close", 100)]
#[case(40.0, "stop", 60)]
fn snapshot_reflects_start_position(#[case] start: f64, #[case] action: &str, #[case] p: i64) {
    let (sim, _feed) = spawn(fast(start));
    let snap = sim.snapshot();
    assert_eq!(snap.get("1"), Some(&DpValue::from(action)));
    assert_eq!(snap.get("2"), Some(&DpValue::Int(p)));
    assert_eq!(snap.get("3"), Some(&DpValue::Int(p)));
}

#[test]
fn control_only_device_has_no_state_key() {
    let settings = SimSettings {
        dp_percent_state: None,
        ..fast(100.0)
    };
    let (sim, _feed) = spawn(settings);
    assert!(!sim.snapshot().contains_key("3"));
}

#[test]
fn percent_command_moves_and_reports_state() {
    let (mut sim, feed) = spawn(fast(100.0));
    sim.set_state("2", DpValue::Int(70)).expect("command accepted");

    let seen = wait_for(&feed, Duration::from_secs(2), |c| c.contains_key("3"));
    let first = seen.first().expect("echo batch");
    assert_eq!(first.get("2"), Some(&DpValue::Int(70)));
    assert_eq!(first.get("1"), Some(&DpValue::from("close")));
    assert_eq!(
        seen.last().and_then(|c| c.get("3")),
        Some(&DpValue::Int(70))
    );
    sim.wait_until_still(Duration::from_secs(1)).expect("still");
    assert!((sim.position() - 30.0).abs() < 1e-9);
}

#[test]
fn stop_reports_where_it_halted() {
    let (mut sim, feed) = spawn(fast(0.0));
    sim.press("open").expect("press");
    std::thread::sleep(Duration::from_millis(50));
    sim.set_state("1", DpValue::from("stop")).expect("stop");

    let seen = wait_for(&feed, Duration::from_secs(1), |c| {
        c.get("1") == Some(&DpValue::from("stop"))
    });
    let stop = seen.last().expect("stop batch");
    assert!(stop.contains_key("3"));
    assert!(!sim.is_moving());
    let pos = sim.position();
    assert!(pos > 0.0 && pos < 100.0, "halted mid-travel, got {pos}");
}

#[rstest]
#[case("9", DpValue::Int(1))]
#[case("2", DpValue::Int(101))]
#[case("2", DpValue::from("half"))]
#[case("1", DpValue::from("halt"))]
fn bad_writes_are_rejected(#[case] dp: &str, #[case] value: DpValue) {
    let (mut sim, _feed) = spawn(fast(100.0));
    let err = sim.set_state(dp, value).expect_err("rejected");
    let dev = err.downcast_ref::<DeviceError>().expect("device error");
    assert!(matches!(
        dev,
        DeviceError::UnknownDataPoint(_) | DeviceError::InvalidValue { .. }
    ));
}

#[test]
fn offline_device_fails_reads_and_writes() {
    let (mut sim, _feed) = spawn(fast(100.0));
    sim.set_offline(true);
    let err = sim.get_state("3").expect_err("offline");
    assert!(matches!(
        err.downcast_ref::<DeviceError>(),
        Some(DeviceError::Offline)
    ));
    assert!(sim.set_state("2", DpValue::Int(10)).is_err());

    sim.set_offline(false);
    assert_eq!(sim.get_state("3").expect("online"), Some(DpValue::Int(0)));
}

#[test]
fn drop_joins_motor_thread() {
    let (sim, feed) = spawn(fast(100.0));
    drop(sim);
    // the motor owned the only sender
    assert!(feed.recv_timeout(Duration::from_millis(500)).is_err());
}
