pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

use std::collections::BTreeMap;
use std::fmt;

/// Value carried by a single device data-point.
///
/// Window-covering firmwares report the action data-point as a string token
/// (`"open"`, `"close"`, `"stop"`, or vendor variants) and percentages as
/// integers, occasionally stringified.
#[derive(Debug, Clone, PartialEq)]
pub enum DpValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl DpValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DpValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric view of the value, accepting integers and numeric strings.
    pub fn as_percent(&self) -> Option<f64> {
        match self {
            DpValue::Int(v) => Some(*v as f64),
            DpValue::Str(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            DpValue::Bool(_) => None,
        }
    }
}

impl fmt::Display for DpValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DpValue::Bool(b) => write!(f, "{b}"),
            DpValue::Int(v) => write!(f, "{v}"),
            DpValue::Str(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for DpValue {
    fn from(s: &str) -> Self {
        DpValue::Str(s.to_string())
    }
}

impl From<String> for DpValue {
    fn from(s: String) -> Self {
        DpValue::Str(s)
    }
}

impl From<i64> for DpValue {
    fn from(v: i64) -> Self {
        DpValue::Int(v)
    }
}

impl From<bool> for DpValue {
    fn from(v: bool) -> Self {
        DpValue::Bool(v)
    }
}

/// One batch of data-point updates (key -> new value) from the device change feed.
pub type Changes = BTreeMap<String, DpValue>;

/// Command dispatch and state read for one addressable device.
///
/// `get_state` returns `Ok(None)` when the device does not expose the key.
pub trait Device {
    fn get_state(
        &mut self,
        dp: &str,
    ) -> Result<Option<DpValue>, Box<dyn std::error::Error + Send + Sync>>;
    fn set_state(
        &mut self,
        dp: &str,
        value: DpValue,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Device + ?Sized> Device for Box<T> {
    fn get_state(
        &mut self,
        dp: &str,
    ) -> Result<Option<DpValue>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).get_state(dp)
    }

    fn set_state(
        &mut self,
        dp: &str,
        value: DpValue,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_state(dp, value)
    }
}

#[cfg(test)]
mod tests {
    use super::DpValue;

    #[test]
    fn percent_view_accepts_ints_and_numeric_strings() {
        assert_eq!(DpValue::Int(42).as_percent(), Some(42.0));
        assert_eq!(DpValue::from(" 58 ").as_percent(), Some(58.0));
        assert_eq!(DpValue::from("open").as_percent(), None);
        assert_eq!(DpValue::Bool(true).as_percent(), None);
    }

    #[test]
    fn string_view_only_for_tokens() {
        assert_eq!(DpValue::from("close").as_str(), Some("close"));
        assert_eq!(DpValue::Int(1).as_str(), None);
    }
}
