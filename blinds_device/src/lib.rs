//! Simulated window-covering motor.
//!
//! A background thread owns the motor model: it accepts commands written
//! through the `Device` trait, moves the covering at a constant speed and
//! pushes data-point changes on a channel, the same way a networked device
//! reports over its change feed. Position 100 is fully open; the percent
//! data-points use the inverted scale (`p = 100 - position`).
//!
//! Each `SimulatedBlinds` spawns exactly one thread that is shut down when
//! the handle is dropped.
pub mod error;
pub mod util;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use blinds_traits::clock::Clock;
use blinds_traits::{Changes, Device, DpValue};
use crossbeam_channel as xch;

use crate::error::{DeviceError, Result};

/// Tokens and keys the simulated firmware understands.
#[derive(Debug, Clone)]
pub struct SimSettings {
    pub dp_action: String,
    pub dp_percent_control: String,
    /// `None` simulates a motor with no position readback (percent-control echo only)
    pub dp_percent_state: Option<String>,
    pub cmd_open: String,
    pub cmd_close: String,
    pub cmd_stop: String,
    /// Full close -> open travel time
    pub travel: Duration,
    /// Starting position, 0 (closed) ..= 100 (open)
    pub start_position: f64,
    /// Motor integration step
    pub tick: Duration,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            dp_action: "1".into(),
            dp_percent_control: "2".into(),
            dp_percent_state: Some("3".into()),
            cmd_open: "open".into(),
            cmd_close: "close".into(),
            cmd_stop: "stop".into(),
            travel: Duration::from_secs(45),
            start_position: 100.0,
            tick: Duration::from_millis(20),
        }
    }
}

#[derive(Debug)]
enum SimCommand {
    Action(String),
    Percent(i64),
}

#[derive(Debug)]
struct SimState {
    position: f64,
    goal: Option<f64>,
    dps: Changes,
    offline: bool,
}

impl SimState {
    fn percent(&self) -> i64 {
        (100.0 - self.position).round() as i64
    }
}

pub struct SimulatedBlinds {
    settings: SimSettings,
    state: Arc<Mutex<SimState>>,
    cmd_tx: xch::Sender<SimCommand>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl std::fmt::Debug for SimulatedBlinds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedBlinds")
            .field("position", &self.position())
            .finish()
    }
}

impl SimulatedBlinds {
    /// Start the motor thread. Returns the device handle and its change feed.
    pub fn spawn<C: Clock + Send + 'static>(
        settings: SimSettings,
        clock: C,
    ) -> (Self, xch::Receiver<Changes>) {
        let start = settings.start_position.clamp(0.0, 100.0);
        let mut dps = Changes::new();
        let action = if start <= 0.0 {
            &settings.cmd_close
        } else if start >= 100.0 {
            &settings.cmd_open
        } else {
            &settings.cmd_stop
        };
        dps.insert(settings.dp_action.clone(), DpValue::from(action.as_str()));
        let percent = (100.0 - start).round() as i64;
        dps.insert(settings.dp_percent_control.clone(), DpValue::Int(percent));
        if let Some(dp) = &settings.dp_percent_state {
            dps.insert(dp.clone(), DpValue::Int(percent));
        }

        let state = Arc::new(Mutex::new(SimState {
            position: start,
            goal: None,
            dps,
            offline: false,
        }));
        let (cmd_tx, cmd_rx) = xch::unbounded();
        let (feed_tx, feed_rx) = xch::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));

        let motor = Motor {
            settings: settings.clone(),
            state: state.clone(),
            feed: feed_tx,
        };
        let shutdown_clone = shutdown.clone();
        let join_handle = std::thread::spawn(move || motor.run(&cmd_rx, &shutdown_clone, &clock));

        (
            Self {
                settings,
                state,
                cmd_tx,
                shutdown,
                join_handle: Some(join_handle),
            },
            feed_rx,
        )
    }

    /// Current data-point values, as a session would read them on connect.
    pub fn snapshot(&self) -> Changes {
        self.state
            .lock()
            .map(|s| s.dps.clone())
            .unwrap_or_default()
    }

    /// True position of the simulated covering.
    pub fn position(&self) -> f64 {
        self.state.lock().map(|s| s.position).unwrap_or(f64::NAN)
    }

    pub fn is_moving(&self) -> bool {
        self.state.lock().map(|s| s.goal.is_some()).unwrap_or(false)
    }

    /// Make every read and write fail until switched back.
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut s) = self.state.lock() {
            s.offline = offline;
        }
    }

    /// Operate the wall switch: the motor moves without any command from a session.
    pub fn press(&self, token: &str) -> Result<()> {
        self.check_action(token)?;
        self.cmd_tx
            .send(SimCommand::Action(token.to_string()))
            .map_err(|_| DeviceError::Offline)
    }

    /// Block until the motor is still, or fail with `DeviceError::Timeout`.
    pub fn wait_until_still(&self, timeout: Duration) -> Result<()> {
        util::wait_until(|| !self.is_moving(), timeout, Duration::from_millis(5))
    }

    fn check_action(&self, token: &str) -> Result<()> {
        let s = &self.settings;
        if token == s.cmd_open || token == s.cmd_close || token == s.cmd_stop {
            Ok(())
        } else {
            Err(DeviceError::InvalidValue {
                dp: s.dp_action.clone(),
                value: token.to_string(),
            })
        }
    }

    fn is_offline(&self) -> bool {
        self.state.lock().map(|s| s.offline).unwrap_or(true)
    }
}

impl Drop for SimulatedBlinds {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("simulated motor thread panicked");
        }
    }
}

impl Device for SimulatedBlinds {
    fn get_state(
        &mut self,
        dp: &str,
    ) -> std::result::Result<Option<DpValue>, Box<dyn std::error::Error + Send + Sync>> {
        let s = self.state.lock().map_err(|_| DeviceError::Offline)?;
        if s.offline {
            return Err(Box::new(DeviceError::Offline));
        }
        Ok(s.dps.get(dp).cloned())
    }

    fn set_state(
        &mut self,
        dp: &str,
        value: DpValue,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.is_offline() {
            return Err(Box::new(DeviceError::Offline));
        }
        let cmd = if dp == self.settings.dp_action {
            let token = value.as_str().ok_or_else(|| DeviceError::InvalidValue {
                dp: dp.to_string(),
                value: value.to_string(),
            })?;
            self.check_action(token)?;
            SimCommand::Action(token.to_string())
        } else if dp == self.settings.dp_percent_control {
            match value.as_percent() {
                Some(p) if (0.0..=100.0).contains(&p) => SimCommand::Percent(p.round() as i64),
                _ => {
                    return Err(Box::new(DeviceError::InvalidValue {
                        dp: dp.to_string(),
                        value: value.to_string(),
                    }));
                }
            }
        } else {
            return Err(Box::new(DeviceError::UnknownDataPoint(dp.to_string())));
        };
        tracing::debug!(dp, %value, "sim command");
        self.cmd_tx.send(cmd).map_err(|_| DeviceError::Offline)?;
        Ok(())
    }
}

/// The motor model, owned by the background thread.
struct Motor {
    settings: SimSettings,
    state: Arc<Mutex<SimState>>,
    feed: xch::Sender<Changes>,
}

impl Motor {
    fn run<C: Clock>(self, commands: &xch::Receiver<SimCommand>, shutdown: &AtomicBool, clock: &C) {
        let mut last = clock.now();
        loop {
            if shutdown.load(Ordering::Relaxed) {
                tracing::debug!("sim motor received shutdown signal");
                break;
            }
            let changes = match commands.recv_timeout(self.settings.tick) {
                Ok(cmd) => self.apply(cmd),
                Err(xch::RecvTimeoutError::Timeout) => None,
                Err(xch::RecvTimeoutError::Disconnected) => break,
            };
            if let Some(changes) = changes
                && !self.emit(changes)
            {
                break;
            }

            let now = clock.now();
            let dt = now.saturating_duration_since(last);
            last = now;
            if let Some(changes) = self.advance(dt)
                && !self.emit(changes)
            {
                break;
            }
        }
        tracing::trace!("sim motor thread exiting cleanly");
    }

    /// Push a batch on the feed; false once nobody is listening.
    fn emit(&self, changes: Changes) -> bool {
        if self.feed.send(changes).is_err() {
            tracing::debug!("sim feed consumer disconnected, exiting thread");
            return false;
        }
        true
    }

    fn apply(&self, cmd: SimCommand) -> Option<Changes> {
        let s = &self.settings;
        let mut st = self.state.lock().ok()?;
        let mut changes = Changes::new();
        match cmd {
            SimCommand::Action(token) => {
                if token == s.cmd_open {
                    st.goal = Some(100.0);
                } else if token == s.cmd_close {
                    st.goal = Some(0.0);
                } else {
                    st.goal = None;
                    if let Some(dp) = &s.dp_percent_state {
                        changes.insert(dp.clone(), DpValue::Int(st.percent()));
                    }
                }
                changes.insert(s.dp_action.clone(), DpValue::from(token));
            }
            SimCommand::Percent(p) => {
                let goal = (100 - p) as f64;
                changes.insert(s.dp_percent_control.clone(), DpValue::Int(p));
                if (goal - st.position).abs() > f64::EPSILON {
                    let dir = if goal > st.position {
                        &s.cmd_open
                    } else {
                        &s.cmd_close
                    };
                    changes.insert(s.dp_action.clone(), DpValue::from(dir.as_str()));
                    st.goal = Some(goal);
                } else if let Some(dp) = &s.dp_percent_state {
                    changes.insert(dp.clone(), DpValue::Int(p));
                }
            }
        }
        for (k, v) in &changes {
            st.dps.insert(k.clone(), v.clone());
        }
        Some(changes)
    }

    /// Integrate motion over `dt`; reports the readback when the goal is reached.
    fn advance(&self, dt: Duration) -> Option<Changes> {
        let mut st = self.state.lock().ok()?;
        let goal = st.goal?;
        let travel_ms = self.settings.travel.as_secs_f64() * 1000.0;
        let step = if travel_ms > 0.0 {
            dt.as_secs_f64() * 1000.0 / travel_ms * 100.0
        } else {
            100.0
        };
        let remaining = goal - st.position;
        if remaining.abs() > step {
            st.position += step.copysign(remaining);
            return None;
        }

        st.position = goal;
        st.goal = None;
        tracing::debug!(position = goal, "sim motor reached goal");
        let dp = self.settings.dp_percent_state.clone()?;
        let p = DpValue::Int(st.percent());
        st.dps.insert(dp.clone(), p.clone());
        Some(Changes::from([(dp, p)]))
    }
}
