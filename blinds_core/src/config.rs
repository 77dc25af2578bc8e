//! Runtime configuration for sessions and the event runner.
//!
//! These are separate from the TOML-deserialized config in `blinds_config`.

/// Feedback reconciliation tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackCfg {
    /// Quiet period after the last percent-control echo before the move is
    /// considered finished. Default: 1500 ms.
    pub debounce_ms: u64,
    /// Treat a percent-state reading of exactly 0 as real instead of skipping it.
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

/// Event runner limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerCfg {
    /// Hard cap on a single run.
    pub max_run_ms: u64,
    /// The session must stay idle this long before a run counts as settled.
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
