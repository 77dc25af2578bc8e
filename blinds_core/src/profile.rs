//! Per-device tunables: travel timing, command tokens and data-point keys.
//!
//! Everything here is resolved once at session start. Unusable values never
//! fail the session; they fall back to the defaults below with a warning.

/// Seconds for a full close -> open traverse when nothing usable is configured.
pub const DEFAULT_DURATION_S: u32 = 45;

pub const DEFAULT_CMD_OPEN: &str = "open";
pub const DEFAULT_CMD_CLOSE: &str = "close";
pub const DEFAULT_CMD_STOP: &str = "stop";

pub const DEFAULT_DP_ACTION: &str = "1";
pub const DEFAULT_DP_PERCENT_CONTROL: &str = "2";
pub const DEFAULT_DP_PERCENT_STATE: &str = "3";

/// Fully open, in position units.
pub const OPEN: f64 = 100.0;
/// Fully closed (mechanically), in position units.
pub const CLOSED: f64 = 0.0;

/// Travel timing of one covering.
///
/// Position units run from `min_position` (end of the tightening band) to 100
/// (fully open); `duration_s` seconds of drive cover 100 units, so one unit
/// takes `duration_s * 10` milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravelProfile {
    duration_s: u32,
    tightening_s: u32,
    min_position: i32,
}

impl Default for TravelProfile {
    fn default() -> Self {
        Self {
            duration_s: DEFAULT_DURATION_S,
            tightening_s: 0,
            min_position: 0,
        }
    }
}

impl TravelProfile {
    /// Build from raw seconds. `None`, zero or negative durations fall back to
    /// 45 s; a tightening tail that is negative or not shorter than the full
    /// traverse is ignored.
    pub fn new(duration_s: Option<i64>, tightening_s: Option<i64>) -> Self {
        let duration_s = match duration_s {
            Some(d) if d > 0 => u32::try_from(d).unwrap_or(u32::MAX),
            Some(d) => {
                tracing::warn!(
                    duration_s = d,
                    fallback = DEFAULT_DURATION_S,
                    "travel duration must be > 0; using default"
                );
                DEFAULT_DURATION_S
            }
            None => DEFAULT_DURATION_S,
        };
        let tightening_s = match tightening_s {
            Some(t) if t > 0 && t < i64::from(duration_s) => t as u32,
            Some(t) if t != 0 => {
                tracing::warn!(
                    tightening_s = t,
                    duration_s,
                    "tightening must be >= 0 and shorter than the travel duration; ignoring"
                );
                0
            }
            _ => 0,
        };
        Self {
            duration_s,
            tightening_s,
            min_position: min_position_for(duration_s, tightening_s),
        }
    }

    #[inline]
    pub fn duration_s(&self) -> u32 {
        self.duration_s
    }

    #[inline]
    pub fn tightening_s(&self) -> u32 {
        self.tightening_s
    }

    /// Logical floor below mechanical closed; 0 without a tightening band.
    #[inline]
    pub fn min_position(&self) -> f64 {
        f64::from(self.min_position)
    }

    /// Milliseconds of drive per position unit.
    #[inline]
    pub fn ms_per_unit(&self) -> f64 {
        f64::from(self.duration_s) * 10.0
    }

    /// Drive time in milliseconds to cover `units` of travel in either direction.
    #[inline]
    pub fn travel_ms(&self, units: f64) -> f64 {
        units.abs() * self.ms_per_unit()
    }
}

/// `round(tightening * -100 / (duration - tightening))`, or 0 without tightening.
fn min_position_for(duration_s: u32, tightening_s: u32) -> i32 {
    if tightening_s == 0 || tightening_s >= duration_s {
        return 0;
    }
    let t = f64::from(tightening_s);
    let d = f64::from(duration_s);
    // JS-style rounding: halves go toward +inf
    (t * -100.0 / (d - t) + 0.5).floor() as i32
}

/// Open/close/stop tokens written to the action data-point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTokens {
    pub open: String,
    pub close: String,
    pub stop: String,
}

impl Default for CommandTokens {
    fn default() -> Self {
        Self {
            open: DEFAULT_CMD_OPEN.to_string(),
            close: DEFAULT_CMD_CLOSE.to_string(),
            stop: DEFAULT_CMD_STOP.to_string(),
        }
    }
}

impl CommandTokens {
    /// Resolve configured tokens. Missing tokens take their defaults, `flip`
    /// swaps open and close, and a set that is not pairwise distinct after
    /// that is replaced by the (flipped) defaults.
    pub fn resolve(open: Option<&str>, close: Option<&str>, stop: Option<&str>, flip: bool) -> Self {
        let pick = |v: Option<&str>, d: &str| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(d)
                .to_string()
        };
        let tokens = Self {
            open: pick(open, DEFAULT_CMD_OPEN),
            close: pick(close, DEFAULT_CMD_CLOSE),
            stop: pick(stop, DEFAULT_CMD_STOP),
        }
        .flipped(flip);

        if tokens.is_distinct() {
            tokens
        } else {
            tracing::warn!(
                open = %tokens.open,
                close = %tokens.close,
                stop = %tokens.stop,
                "command tokens are not distinct; using defaults"
            );
            Self::default().flipped(flip)
        }
    }

    fn flipped(self, flip: bool) -> Self {
        if flip {
            Self {
                open: self.close,
                close: self.open,
                stop: self.stop,
            }
        } else {
            self
        }
    }

    fn is_distinct(&self) -> bool {
        self.open != self.close && self.open != self.stop && self.close != self.stop
    }
}

/// Data-point keys of the three attributes the estimator cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPoints {
    pub action: String,
    pub percent_control: String,
    pub percent_state: String,
}

impl Default for DataPoints {
    fn default() -> Self {
        Self {
            action: DEFAULT_DP_ACTION.to_string(),
            percent_control: DEFAULT_DP_PERCENT_CONTROL.to_string(),
            percent_state: DEFAULT_DP_PERCENT_STATE.to_string(),
        }
    }
}

impl DataPoints {
    /// Same fallback rules as `CommandTokens::resolve`, without the flip.
    pub fn resolve(
        action: Option<&str>,
        percent_control: Option<&str>,
        percent_state: Option<&str>,
    ) -> Self {
        let pick = |v: Option<&str>, d: &str| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(d)
                .to_string()
        };
        let dps = Self {
            action: pick(action, DEFAULT_DP_ACTION),
            percent_control: pick(percent_control, DEFAULT_DP_PERCENT_CONTROL),
            percent_state: pick(percent_state, DEFAULT_DP_PERCENT_STATE),
        };
        if dps.action != dps.percent_control
            && dps.action != dps.percent_state
            && dps.percent_control != dps.percent_state
        {
            dps
        } else {
            tracing::warn!(
                action = %dps.action,
                percent_control = %dps.percent_control,
                percent_state = %dps.percent_state,
                "data-point keys are not distinct; using defaults"
            );
            Self::default()
        }
    }
}

/// Everything the session needs to know about one device.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceProfile {
    pub name: Option<String>,
    pub travel: TravelProfile,
    pub tokens: CommandTokens,
    pub dps: DataPoints,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_position_without_tightening_is_zero() {
        assert_eq!(TravelProfile::new(Some(45), Some(0)).min_position(), 0.0);
        assert_eq!(TravelProfile::new(Some(45), None).min_position(), 0.0);
    }

    #[test]
    fn min_position_with_tightening() {
        // 10 * -100 / 40 = -25
        assert_eq!(TravelProfile::new(Some(50), Some(10)).min_position(), -25.0);
        // 5 * -100 / 40 = -12.5 -> -12 (halves round up)
        assert_eq!(TravelProfile::new(Some(45), Some(5)).min_position(), -12.0);
    }

    #[test]
    fn bad_durations_fall_back() {
        assert_eq!(TravelProfile::new(Some(0), None).duration_s(), 45);
        assert_eq!(TravelProfile::new(Some(-3), None).duration_s(), 45);
        assert_eq!(TravelProfile::new(None, None).duration_s(), 45);
        let p = TravelProfile::new(Some(10), Some(10));
        assert_eq!(p.tightening_s(), 0);
        assert_eq!(p.min_position(), 0.0);
    }

    #[test]
    fn ms_per_unit_matches_duration() {
        let p = TravelProfile::new(Some(45), None);
        assert_eq!(p.ms_per_unit(), 450.0);
        assert_eq!(p.travel_ms(-100.0), 45_000.0);
    }

    #[test]
    fn flip_swaps_open_and_close() {
        let t = CommandTokens::resolve(Some("up"), Some("down"), None, true);
        assert_eq!(t.open, "down");
        assert_eq!(t.close, "up");
        assert_eq!(t.stop, "stop");
    }

    #[test]
    fn duplicate_tokens_fall_back_to_defaults() {
        let t = CommandTokens::resolve(Some("go"), Some("go"), None, false);
        assert_eq!(t, CommandTokens::default());
        let t = CommandTokens::resolve(Some("stop"), None, None, true);
        assert_eq!(t.open, "close");
        assert_eq!(t.close, "open");
    }

    #[test]
    fn blank_keys_take_defaults() {
        let d = DataPoints::resolve(Some("  "), Some("7"), None);
        assert_eq!(d.action, "1");
        assert_eq!(d.percent_control, "7");
        assert_eq!(d.percent_state, "3");
    }
}
