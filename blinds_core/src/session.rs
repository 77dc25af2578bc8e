//! One accessory session: owns the estimate, the two timer slots and the
//! device handle, and turns notifications, timer expiries and presentation
//! requests into pure transitions.
//!
//! Everything runs on the caller's thread. Feed batches, timer polls and
//! requests must be serialized by the caller (see `runner`).

use std::sync::Arc;
use std::time::Instant;

use blinds_traits::clock::{Clock, MonotonicClock};
use blinds_traits::{Changes, Device, DpValue};
use crossbeam_channel as xch;
use eyre::WrapErr;

use crate::config::FeedbackCfg;
use crate::device_error::map_device_error;
use crate::error::{BuildError, Result};
use crate::estimator::{Estimate, Motion, reported};
use crate::feedback::{self, FeedbackMode, position_from_percent};
use crate::machine::{self, Action};
use crate::profile::DeviceProfile;
use crate::reconciler;
use crate::timer::TimerSlot;
use crate::transition::{Effect, Transition, Update};
use crate::util::{ms_between, ms_to_duration};

pub struct BlindsSession<D: Device> {
    device: D,
    profile: DeviceProfile,
    feedback: FeedbackCfg,
    mode: FeedbackMode,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
    estimate: Estimate,
    last_action: Option<String>,
    completion: TimerSlot<f64>,
    debounce: TimerSlot<f64>,
    subscribers: Vec<xch::Sender<Update>>,
}

impl<D: Device> core::fmt::Debug for BlindsSession<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlindsSession")
            .field("mode", &self.mode)
            .field("estimate", &self.estimate)
            .field("completion_armed", &self.completion.is_armed())
            .field("debounce_armed", &self.debounce.is_armed())
            .finish()
    }
}

/// Builder for `BlindsSession`. Only the device is mandatory.
pub struct SessionBuilder<D> {
    device: Option<D>,
    profile: Option<DeviceProfile>,
    feedback: Option<FeedbackCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    initial: Option<Changes>,
}

impl<D> Default for SessionBuilder<D> {
    fn default() -> Self {
        Self {
            device: None,
            profile: None,
            feedback: None,
            clock: None,
            initial: None,
        }
    }
}

impl<D: Device> SessionBuilder<D> {
    pub fn with_device(mut self, device: D) -> Self {
        self.device = Some(device);
        self
    }

    pub fn with_profile(mut self, profile: DeviceProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_feedback(mut self, feedback: FeedbackCfg) -> Self {
        self.feedback = Some(feedback);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Data-point snapshot read from the device when the session starts.
    pub fn with_initial_state(mut self, dps: Changes) -> Self {
        self.initial = Some(dps);
        self
    }

    pub fn build(self) -> Result<BlindsSession<D>> {
        let device = self
            .device
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDevice))?;
        let feedback = self.feedback.unwrap_or_default();
        if feedback.debounce_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "debounce_ms must be >= 1",
            )));
        }
        let profile = self.profile.unwrap_or_default();
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let initial = self.initial.unwrap_or_default();

        let mode = if initial.contains_key(&profile.dps.percent_state) {
            FeedbackMode::PercentState
        } else {
            FeedbackMode::PercentControl
        };
        let last_action = initial
            .get(&profile.dps.action)
            .and_then(DpValue::as_str)
            .map(str::to_string);
        let was_close = last_action.as_deref() == Some(profile.tokens.close.as_str());
        let mut estimate = Estimate::seeded(&profile.travel, was_close);

        let feedback_dp = match mode {
            FeedbackMode::PercentState => &profile.dps.percent_state,
            FeedbackMode::PercentControl => &profile.dps.percent_control,
        };
        let reading = initial.get(feedback_dp).and_then(DpValue::as_percent);
        if let Some(p) = reading.filter(|p| usable_reading(mode, *p, &feedback)) {
            estimate = Estimate::stopped_at(position_from_percent(p, &profile.travel));
        }

        tracing::info!(
            name = profile.name.as_deref().unwrap_or("-"),
            mode = mode.as_str(),
            duration_s = profile.travel.duration_s(),
            min_position = profile.travel.min_position(),
            position = estimate.position,
            "session started"
        );

        let epoch = clock.now();
        Ok(BlindsSession {
            device,
            profile,
            feedback,
            mode,
            clock,
            epoch,
            estimate,
            last_action,
            completion: TimerSlot::new(),
            debounce: TimerSlot::new(),
            subscribers: Vec::new(),
        })
    }
}

/// A percent-state 0 is skipped unless configured as a real reading.
fn usable_reading(mode: FeedbackMode, p: f64, feedback: &FeedbackCfg) -> bool {
    mode != FeedbackMode::PercentState || p != 0.0 || feedback.percent_state_zero_is_valid
}

impl<D: Device> BlindsSession<D> {
    /// Start building a session.
    pub fn builder() -> SessionBuilder<D> {
        SessionBuilder::default()
    }

    /// Receive every update the session publishes from now on. The current
    /// position, target and state are sent right away.
    pub fn subscribe(&mut self) -> xch::Receiver<Update> {
        let (tx, rx) = xch::unbounded();
        let snapshot = [
            Update::CurrentPosition(self.estimate.reported()),
            Update::TargetPosition(self.target_from_action(self.last_action.as_deref())),
            Update::PositionState(self.estimate.motion),
        ];
        for u in snapshot {
            let _ = tx.send(u);
        }
        self.subscribers.push(tx);
        rx
    }

    /// Apply one batch from the device change feed. Keys the session does not
    /// track are ignored.
    pub fn handle_changes(&mut self, changes: &Changes) {
        let travel = self.profile.travel;
        tracing::debug!(?changes, "device change");

        if let Some(value) = changes.get(&self.profile.dps.action) {
            let action = value
                .as_str()
                .and_then(|s| Action::from_token(s, &self.profile.tokens));
            self.last_action = value.as_str().map(str::to_string);
            match action {
                Some(action) => {
                    tracing::debug!(?action, "action change");
                    let t = machine::on_action(self.estimate, action, &travel, self.now_ms());
                    self.apply(t);
                }
                None => tracing::debug!(%value, "unrecognized action ignored"),
            }
        }

        let dp = self.feedback_dp();
        let Some(value) = changes.get(dp) else {
            return;
        };
        let Some(p) = value.as_percent() else {
            tracing::debug!(%value, dp, "non-numeric feedback ignored");
            return;
        };
        match self.mode {
            FeedbackMode::PercentState => {
                let zero_ok = self.feedback.percent_state_zero_is_valid;
                if let Some(t) = feedback::on_percent_state(self.estimate, p, zero_ok, &travel) {
                    self.apply(t);
                }
            }
            FeedbackMode::PercentControl => {
                let t = feedback::on_percent_control(
                    self.estimate,
                    p,
                    self.feedback.debounce_ms,
                    &travel,
                );
                self.apply(t);
            }
        }
    }

    /// Fire every timer whose deadline has passed, earliest first. Returns the
    /// number fired.
    pub fn poll_timers(&mut self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        loop {
            let completion = self.completion.deadline().filter(|d| *d <= now);
            let debounce = self.debounce.deadline().filter(|d| *d <= now);
            let t = match (completion, debounce) {
                (Some(c), Some(d)) if d < c => self.fire_debounce(now),
                (Some(_), _) => self
                    .completion
                    .take_due(now)
                    .map(machine::complete),
                (None, Some(_)) => self.fire_debounce(now),
                (None, None) => break,
            };
            if let Some(t) = t {
                self.apply(t);
                fired += 1;
            }
        }
        fired
    }

    fn fire_debounce(&mut self, now: Instant) -> Option<Transition> {
        let settled = self.debounce.take_due(now)?;
        Some(feedback::settle(self.estimate, settled))
    }

    /// Earliest armed timer deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.completion.deadline(), self.debounce.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Read the feedback data-point and report the reconciled position.
    ///
    /// A stationary session in percent-state mode adopts the reading. While
    /// moving, the time projection is reported and nothing is committed. The
    /// percent-control data-point only holds the last command, so it is never
    /// adopted here.
    pub fn get_current_position(&mut self) -> Result<u8> {
        let dp = self.feedback_dp().to_string();
        let read = self
            .device
            .get_state(&dp)
            .map_err(|e| eyre::Report::new(map_device_error(&*e)))
            .wrap_err_with(|| format!("reading data-point {dp}"))?;

        let travel = self.profile.travel;
        let percent = read
            .as_ref()
            .and_then(DpValue::as_percent)
            .filter(|p| usable_reading(self.mode, *p, &self.feedback));
        match (self.estimate.motion, self.mode, percent) {
            (Motion::Stopped, FeedbackMode::PercentState, Some(p)) => {
                self.estimate = Estimate::stopped_at(position_from_percent(p, &travel));
                Ok(self.estimate.reported())
            }
            (Motion::Stopped, _, _) => Ok(self.estimate.reported()),
            _ => Ok(reported(self.estimate.projected(&travel, self.now_ms()))),
        }
    }

    /// Read the action data-point: open -> 100, close -> 0, otherwise the
    /// current estimate.
    pub fn get_target_position(&mut self) -> Result<u8> {
        let dp = self.profile.dps.action.clone();
        let read = self
            .device
            .get_state(&dp)
            .map_err(|e| eyre::Report::new(map_device_error(&*e)))
            .wrap_err_with(|| format!("reading data-point {dp}"))?;
        Ok(self.target_from_action(read.as_ref().and_then(DpValue::as_str)))
    }

    /// Move toward `value` (0 closed .. 100 open). On dispatch failure the
    /// session is left exactly as it was.
    pub fn set_target_position(&mut self, value: u8) -> Result<()> {
        let t = reconciler::set_target(self.estimate, value, &self.profile, self.now_ms());
        for cmd in t.commands() {
            self.device
                .set_state(&cmd.dp, cmd.value.clone())
                .map_err(|e| eyre::Report::new(map_device_error(&*e)))
                .wrap_err_with(|| format!("sending {}={}", cmd.dp, cmd.value))?;
        }
        self.apply(t);
        Ok(())
    }

    pub fn get_position_state(&self) -> Motion {
        self.estimate.motion
    }

    /// Stopped with no timer pending.
    pub fn is_idle(&self) -> bool {
        self.estimate.motion == Motion::Stopped
            && !self.completion.is_armed()
            && !self.debounce.is_armed()
    }

    pub fn estimate(&self) -> Estimate {
        self.estimate
    }

    pub fn mode(&self) -> FeedbackMode {
        self.mode
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn clock(&self) -> &(dyn Clock + Send + Sync) {
        &*self.clock
    }

    /// Milliseconds since the session started, on the session clock.
    pub fn now_ms(&self) -> f64 {
        ms_between(self.epoch, self.clock.now())
    }

    fn feedback_dp(&self) -> &str {
        match self.mode {
            FeedbackMode::PercentState => &self.profile.dps.percent_state,
            FeedbackMode::PercentControl => &self.profile.dps.percent_control,
        }
    }

    fn target_from_action(&self, action: Option<&str>) -> u8 {
        match action.and_then(|a| Action::from_token(a, &self.profile.tokens)) {
            Some(Action::Open) => 100,
            Some(Action::Close) => 0,
            _ => self.estimate.reported(),
        }
    }

    fn apply(&mut self, t: Transition) {
        let now = self.clock.now();
        self.estimate = t.estimate;
        for effect in t.effects {
            match effect {
                Effect::Publish(u) => self.publish(&u),
                // sent before the transition is committed
                Effect::Dispatch(_) => {}
                Effect::CancelCompletion => {
                    self.completion.cancel();
                }
                Effect::ArmCompletion {
                    after_ms,
                    settle_at,
                } => {
                    self.completion.arm(now + ms_to_duration(after_ms), settle_at);
                }
                Effect::ArmDebounce { after_ms, settled } => {
                    self.debounce.arm(now + ms_to_duration(after_ms), settled);
                }
                Effect::CancelDebounce => {
                    self.debounce.cancel();
                }
            }
        }
    }

    fn publish(&mut self, update: &Update) {
        self.subscribers.retain(|tx| tx.send(update.clone()).is_ok());
    }
}
