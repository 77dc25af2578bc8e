//! Session assembly against the simulated motor, and the simulate/press runs.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use blinds_config::{Config, SimFeedback};
use blinds_core::error::Result;
use blinds_core::runner::{self, RunReport};
use blinds_core::{BlindsSession, DeviceProfile, FeedbackCfg, RunnerCfg, Update};
use blinds_device::{SimSettings, SimulatedBlinds};
use blinds_traits::{Changes, MonotonicClock};
use crossbeam_channel as xch;
use serde_json::json;

use crate::cli::LAST_MAX_RUN_MS;

/// A running simulator wired to a fresh session.
pub struct Rig {
    pub session: BlindsSession<SimulatedBlinds>,
    pub feed: xch::Receiver<Changes>,
    pub updates: xch::Receiver<Update>,
}

/// Map the simulator config and device profile onto simulator settings.
fn sim_settings(cfg: &Config, profile: &DeviceProfile, from: Option<u8>) -> SimSettings {
    let dps = &profile.dps;
    SimSettings {
        dp_action: dps.action.clone(),
        dp_percent_control: dps.percent_control.clone(),
        dp_percent_state: match cfg.simulator.feedback {
            SimFeedback::PercentState => Some(dps.percent_state.clone()),
            SimFeedback::PercentControl => None,
        },
        cmd_open: profile.tokens.open.clone(),
        cmd_close: profile.tokens.close.clone(),
        cmd_stop: profile.tokens.stop.clone(),
        travel: Duration::from_secs(u64::from(profile.travel.duration_s())),
        start_position: f64::from(from.unwrap_or(cfg.simulator.start_position)),
        tick: Duration::from_millis(cfg.simulator.tick_ms),
    }
}

/// Spawn the simulator and build a session from its initial snapshot.
pub fn assemble(cfg: &Config, from: Option<u8>) -> Result<Rig> {
    let profile = DeviceProfile::from(&cfg.device);
    let feedback: FeedbackCfg = (&cfg.feedback).into();
    let settings = sim_settings(cfg, &profile, from);
    tracing::debug!(?settings, "starting simulator");

    let (sim, feed) = SimulatedBlinds::spawn(settings, MonotonicClock::new());
    let initial = sim.snapshot();
    let mut session = BlindsSession::builder()
        .with_device(sim)
        .with_profile(profile)
        .with_feedback(feedback)
        .with_initial_state(initial)
        .build()?;
    let updates = session.subscribe();
    Ok(Rig {
        session,
        feed,
        updates,
    })
}

fn runner_cfg(cfg: &Config, max_run_ms: Option<u64>) -> RunnerCfg {
    let mut runner: RunnerCfg = (&cfg.runner).into();
    if let Some(ms) = max_run_ms {
        runner.max_run_ms = ms;
    }
    let _ = LAST_MAX_RUN_MS.set(runner.max_run_ms);
    runner
}

/// Move to `target` and wait for the estimate to settle.
pub fn run_simulate(
    cfg: &Config,
    target: u8,
    from: Option<u8>,
    max_run_ms: Option<u64>,
    json: bool,
    shutdown: &AtomicBool,
) -> Result<RunReport> {
    let runner = runner_cfg(cfg, max_run_ms);
    let mut rig = assemble(cfg, from)?;
    tracing::info!(target_position = target, "move start");

    rig.session.set_target_position(target)?;
    let result = runner::run(&mut rig.session, &rig.feed, &runner, shutdown);
    print_updates(&rig.updates, json);
    let report = result?;
    print_settled(&report, rig.session.device().position(), json);
    Ok(report)
}

/// Press `token` on the simulated switch, optionally stop after a delay, and
/// wait for the estimate to settle.
pub fn run_press(
    cfg: &Config,
    token: &str,
    from: Option<u8>,
    stop_after_ms: Option<u64>,
    max_run_ms: Option<u64>,
    json: bool,
    shutdown: &AtomicBool,
) -> Result<RunReport> {
    let runner = runner_cfg(cfg, max_run_ms);
    let mut rig = assemble(cfg, from)?;
    tracing::info!(token, "switch pressed");
    rig.session.device().press(token)?;

    if let Some(ms) = stop_after_ms {
        pump_for(&mut rig, Duration::from_millis(ms));
        let stop = rig.session.profile().tokens.stop.clone();
        tracing::info!(after_ms = ms, "switch stop pressed");
        rig.session.device().press(&stop)?;
    }

    let result = runner::run(&mut rig.session, &rig.feed, &runner, shutdown);
    print_updates(&rig.updates, json);
    let report = result?;
    print_settled(&report, rig.session.device().position(), json);
    Ok(report)
}

/// Feed the session for `dur` without waiting for it to settle.
fn pump_for(rig: &mut Rig, dur: Duration) {
    let deadline = Instant::now() + dur;
    while let Some(left) = deadline.checked_duration_since(Instant::now()) {
        rig.session.poll_timers();
        let wait = rig
            .session
            .next_deadline()
            .map_or(left, |d| d.saturating_duration_since(Instant::now()))
            .min(left);
        match rig.feed.recv_timeout(wait) {
            Ok(changes) => rig.session.handle_changes(&changes),
            Err(xch::RecvTimeoutError::Timeout) => {}
            Err(xch::RecvTimeoutError::Disconnected) => break,
        }
    }
    rig.session.poll_timers();
}

fn update_fields(u: &Update) -> (&'static str, serde_json::Value) {
    match u {
        Update::CurrentPosition(p) => ("current_position", json!(p)),
        Update::TargetPosition(p) => ("target_position", json!(p)),
        Update::PositionState(m) => ("position_state", json!(m.as_str())),
    }
}

fn print_updates(updates: &xch::Receiver<Update>, json: bool) {
    for u in updates.try_iter() {
        let (event, value) = update_fields(&u);
        if json {
            println!("{}", json!({ "event": event, "value": value }));
        } else {
            println!("{event}: {value}");
        }
    }
}

fn print_settled(report: &RunReport, true_position: f64, json: bool) {
    if json {
        println!(
            "{}",
            json!({
                "settled": report.position,
                "elapsed_ms": report.elapsed_ms,
                "batches": report.batches,
                "timers": report.timers,
                "device_position": (true_position * 10.0).round() / 10.0,
            })
        );
    } else {
        println!("settled at {}", report.position);
    }
}

/// Start the simulator and session once and read the position back.
pub fn self_check(cfg: &Config) -> Result<(u8, &'static str)> {
    let mut rig = assemble(cfg, None)?;
    let position = rig.session.get_current_position()?;
    Ok((position, rig.session.mode().as_str()))
}

/// Shared shutdown flag, raised by Ctrl-C.
pub fn install_shutdown() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = flag.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        handler_flag.store(true, std::sync::atomic::Ordering::Relaxed);
    }) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }
    flag
}
