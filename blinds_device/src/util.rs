use std::time::{Duration, Instant};

use crate::error::{DeviceError, Result};

/// Wait until `done` returns true, or a timeout expires. Sleeps in small
/// intervals to avoid CPU spinning.
pub fn wait_until(
    mut done: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    while !done() {
        if Instant::now() >= deadline {
            return Err(DeviceError::Timeout);
        }
        std::thread::sleep(poll_interval);
    }
    Ok(())
}
