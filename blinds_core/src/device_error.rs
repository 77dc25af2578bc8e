//! Maps `Box<dyn Error>` from the `Device` trait boundary to typed `BlindsError`.
//!
//! The `blinds_traits::Device` trait uses `Box<dyn Error + Send + Sync>` so any
//! transport can implement it; this module converts those to our typed error
//! enum, with an optional feature-gated path for `blinds_device::DeviceError`.

use crate::error::BlindsError;

/// Map a trait-boundary error to a typed `BlindsError`.
///
/// Attempts to downcast known device error types first, then falls back
/// to string-based heuristics.
pub fn map_device_error(e: &(dyn std::error::Error + 'static)) -> BlindsError {
    // Feature-gated: try to downcast to DeviceError for precise mapping
    #[cfg(feature = "device-errors")]
    {
        if let Some(dev) = e.downcast_ref::<blinds_device::error::DeviceError>() {
            return match dev {
                blinds_device::error::DeviceError::Timeout => BlindsError::Timeout,
                blinds_device::error::DeviceError::Offline => BlindsError::Offline(dev.to_string()),
                other => BlindsError::Device(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        BlindsError::Timeout
    } else if lower.contains("offline") || lower.contains("not connected") {
        BlindsError::Offline(s)
    } else {
        BlindsError::Device(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_heuristics() {
        let e: Box<dyn std::error::Error + Send + Sync> = "socket timed out".into();
        assert_eq!(map_device_error(&*e), BlindsError::Timeout);
        let e: Box<dyn std::error::Error + Send + Sync> = "device offline".into();
        assert!(matches!(map_device_error(&*e), BlindsError::Offline(_)));
        let e: Box<dyn std::error::Error + Send + Sync> = "bad checksum".into();
        assert_eq!(
            map_device_error(&*e),
            BlindsError::Device("bad checksum".into())
        );
    }
}
