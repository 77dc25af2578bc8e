//! `From` implementations bridging `blinds_config` types to `blinds_core` types.
//!
//! Device values that cannot be used fall back to defaults here (with a
//! warning) instead of failing the session.

use crate::config::{FeedbackCfg, RunnerCfg};
use crate::profile::{CommandTokens, DataPoints, DeviceProfile, TravelProfile};

// ── DeviceProfile ────────────────────────────────────────────────────────────

impl From<&blinds_config::DeviceCfg> for DeviceProfile {
    fn from(c: &blinds_config::DeviceCfg) -> Self {
        if c.time_to_open.is_some() && c.time_to_open_s().is_none() {
            tracing::warn!(value = ?c.time_to_open, "time_to_open is not numeric; using default");
        }
        if c.time_to_tighten.is_some() && c.time_to_tighten_s().is_none() {
            tracing::warn!(value = ?c.time_to_tighten, "time_to_tighten is not numeric; ignoring");
        }
        Self {
            name: c.name.clone(),
            travel: TravelProfile::new(c.time_to_open_s(), c.time_to_tighten_s()),
            tokens: CommandTokens::resolve(
                c.cmd_open().as_deref(),
                c.cmd_close().as_deref(),
                c.cmd_stop().as_deref(),
                c.flip_state(),
            ),
            dps: DataPoints::resolve(
                c.dp_action().as_deref(),
                c.dp_percent_control().as_deref(),
                c.dp_percent_state().as_deref(),
            ),
        }
    }
}

// ── FeedbackCfg ──────────────────────────────────────────────────────────────

impl From<&blinds_config::FeedbackCfg> for FeedbackCfg {
    fn from(c: &blinds_config::FeedbackCfg) -> Self {
        Self {
            debounce_ms: c.debounce_ms,
            percent_state_zero_is_valid: c.percent_state_zero_is_valid,
        }
    }
}

// ── RunnerCfg ────────────────────────────────────────────────────────────────

impl From<&blinds_config::RunnerCfg> for RunnerCfg {
    fn from(c: &blinds_config::RunnerCfg) -> Self {
        Self {
            max_run_ms: c.max_run_ms,
            idle_ms: c.idle_ms,
        }
    }
}
