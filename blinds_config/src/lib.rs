#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for window-covering sessions.
//!
//! - `Config` and sub-structs are deserialized from TOML.
//! - The `[device]` table is lenient: every value may be a number, string or
//!   bool, and accessors return `None` for anything unusable so the core can
//!   fall back to its defaults instead of refusing to start.
//! - `Config::validate` checks the session tunables that have no sane fallback.
use serde::Deserialize;

/// A loosely typed TOML scalar.
///
/// Device settings are often hand-edited or imported from other tools, so
/// `time_to_open = "45"` and `dp_action = 1` are both accepted.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl Scalar {
    /// Trimmed, non-empty string form (numbers are stringified; bools are rejected).
    pub fn as_token(&self) -> Option<String> {
        let s = match self {
            Scalar::Int(v) => v.to_string(),
            Scalar::Float(v) if v.is_finite() => v.to_string(),
            Scalar::Str(s) => s.trim().to_string(),
            _ => return None,
        };
        if s.is_empty() { None } else { Some(s) }
    }

    /// Whole seconds, truncating fractions. Non-numeric input yields `None`.
    pub fn as_whole_seconds(&self) -> Option<i64> {
        let v = match self {
            Scalar::Int(v) => return Some(*v),
            Scalar::Float(v) => *v,
            Scalar::Str(s) => s.trim().parse::<f64>().ok()?,
            Scalar::Bool(_) => return None,
        };
        if v.is_finite() {
            Some(v.trunc() as i64)
        } else {
            None
        }
    }

    /// Truthiness: `false`, `0`, `""`, `"false"` and `"0"` are false.
    pub fn truthy(&self) -> bool {
        match self {
            Scalar::Bool(b) => *b,
            Scalar::Int(v) => *v != 0,
            Scalar::Float(v) => *v != 0.0 && !v.is_nan(),
            Scalar::Str(s) => {
                let t = s.trim();
                !(t.is_empty() || t == "0" || t.eq_ignore_ascii_case("false"))
            }
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct DeviceCfg {
    /// Display name, informational only
    pub name: Option<String>,
    /// Data-point key of the open/close/stop action
    pub dp_action: Option<Scalar>,
    /// Data-point key of the percent-control command
    pub dp_percent_control: Option<Scalar>,
    /// Data-point key of the percent-state readback
    pub dp_percent_state: Option<Scalar>,
    pub cmd_open: Option<Scalar>,
    pub cmd_close: Option<Scalar>,
    pub cmd_stop: Option<Scalar>,
    /// Swap the open and close tokens (motor wired in reverse)
    pub flip_state: Option<Scalar>,
    /// Seconds for a full close -> open traverse
    pub time_to_open: Option<Scalar>,
    /// Extra seconds the motor keeps driving after mechanical closed
    pub time_to_tighten: Option<Scalar>,
}

impl DeviceCfg {
    pub fn dp_action(&self) -> Option<String> {
        self.dp_action.as_ref().and_then(Scalar::as_token)
    }
    pub fn dp_percent_control(&self) -> Option<String> {
        self.dp_percent_control.as_ref().and_then(Scalar::as_token)
    }
    pub fn dp_percent_state(&self) -> Option<String> {
        self.dp_percent_state.as_ref().and_then(Scalar::as_token)
    }
    pub fn cmd_open(&self) -> Option<String> {
        self.cmd_open.as_ref().and_then(Scalar::as_token)
    }
    pub fn cmd_close(&self) -> Option<String> {
        self.cmd_close.as_ref().and_then(Scalar::as_token)
    }
    pub fn cmd_stop(&self) -> Option<String> {
        self.cmd_stop.as_ref().and_then(Scalar::as_token)
    }
    pub fn flip_state(&self) -> bool {
        self.flip_state.as_ref().is_some_and(Scalar::truthy)
    }
    pub fn time_to_open_s(&self) -> Option<i64> {
        self.time_to_open.as_ref().and_then(Scalar::as_whole_seconds)
    }
    pub fn time_to_tighten_s(&self) -> Option<i64> {
        self.time_to_tighten
            .as_ref()
            .and_then(Scalar::as_whole_seconds)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FeedbackCfg {
    /// Quiet period before a percent-control echo is taken as settled (ms)
    pub debounce_ms: u64,
    /// Accept a literal 0 on the percent-state data-point as a real reading
    pub percent_state_zero_is_valid: bool,
}

impl Default for FeedbackCfg {
    fn default() -> Self {
        Self {
            debounce_ms: 1500,
            percent_state_zero_is_valid: false,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerCfg {
    /// Give up on a simulated move after this long
    pub max_run_ms: u64,
    /// Quiet period after the estimate settles before the run is considered done
    pub idle_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            max_run_ms: 120_000,
            idle_ms: 250,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SimFeedback {
    /// Device exposes an independent percent-state readback
    #[default]
    PercentState,
    /// Device only echoes the last percent-control value
    PercentControl,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulatorCfg {
    pub feedback: SimFeedback,
    /// Position (0 closed .. 100 open) the simulated motor starts at
    pub start_position: u8,
    /// Motor integration step (ms)
    pub tick_ms: u64,
}

impl Default for SimulatorCfg {
    fn default() -> Self {
        Self {
            feedback: SimFeedback::PercentState,
            start_position: 100,
            tick_ms: 20,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceCfg,
    #[serde(default)]
    pub feedback: FeedbackCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub runner: RunnerCfg,
    #[serde(default)]
    pub simulator: SimulatorCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("invalid configuration in {:?}: {}", path, e))
}

const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
const ROTATIONS: [&str; 3] = ["never", "daily", "hourly"];

impl Config {
    /// Reject session tunables that are out of range. `[device]` is never
    /// rejected here; unusable device values fall back to defaults in the core.
    pub fn validate(&self) -> eyre::Result<()> {
        // Feedback
        if self.feedback.debounce_ms == 0 {
            eyre::bail!("feedback.debounce_ms must be >= 1");
        }
        if self.feedback.debounce_ms > 60_000 {
            eyre::bail!("feedback.debounce_ms is unreasonably large (>60s)");
        }

        // Runner
        if self.runner.max_run_ms == 0 {
            eyre::bail!("runner.max_run_ms must be >= 1");
        }
        if self.runner.idle_ms >= self.runner.max_run_ms {
            eyre::bail!("runner.idle_ms must be < runner.max_run_ms");
        }

        // Simulator
        if self.simulator.start_position > 100 {
            eyre::bail!("simulator.start_position must be in [0, 100]");
        }
        if self.simulator.tick_ms == 0 {
            eyre::bail!("simulator.tick_ms must be >= 1");
        }

        // Logging
        if let Some(level) = self.logging.level.as_deref()
            && !LEVELS.contains(&level.to_ascii_lowercase().as_str())
        {
            eyre::bail!("logging.level must be one of {}", LEVELS.join("|"));
        }
        if let Some(rotation) = self.logging.rotation.as_deref()
            && !ROTATIONS.contains(&rotation.to_ascii_lowercase().as_str())
        {
            eyre::bail!("logging.rotation must be one of {}", ROTATIONS.join("|"));
        }

        Ok(())
    }
}
