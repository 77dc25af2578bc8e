//! Result type shared by every pure transition: the next estimate plus the
//! side effects the session has to carry out.

use blinds_traits::DpValue;

use crate::estimator::{Estimate, Motion};

/// A value pushed to observers of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    CurrentPosition(u8),
    TargetPosition(u8),
    PositionState(Motion),
}

/// One `(data-point, value)` write to the device.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub dp: String,
    pub value: DpValue,
}

impl Command {
    pub fn new(dp: &str, value: impl Into<DpValue>) -> Self {
        Self {
            dp: dp.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Publish(Update),
    Dispatch(Command),
    /// Replace any armed completion with one firing after `after_ms` that
    /// settles the estimate at `settle_at`.
    ArmCompletion { after_ms: f64, settle_at: f64 },
    CancelCompletion,
    /// Replace any armed debounce with one firing after `after_ms`.
    ArmDebounce { after_ms: f64, settled: f64 },
    CancelDebounce,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub estimate: Estimate,
    pub effects: Vec<Effect>,
}

impl Transition {
    pub fn new(estimate: Estimate) -> Self {
        Self {
            estimate,
            effects: Vec::new(),
        }
    }

    pub(crate) fn with(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub(crate) fn publish(self, update: Update) -> Self {
        self.with(Effect::Publish(update))
    }

    /// Commands to send to the device, in order.
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.effects.iter().filter_map(|e| match e {
            Effect::Dispatch(c) => Some(c),
            _ => None,
        })
    }

    /// Updates to publish, in order.
    pub fn updates(&self) -> impl Iterator<Item = &Update> {
        self.effects.iter().filter_map(|e| match e {
            Effect::Publish(u) => Some(u),
            _ => None,
        })
    }
}
