//! Test and helper mocks for blinds_core

use blinds_traits::{Changes, Device, DpValue};

use crate::transition::Command;

/// In-memory device that records every write and serves reads from `state`.
///
/// Writes are stored back into `state`, the way most firmwares keep the last
/// written value readable. Flip `fail_reads` / `fail_writes` to simulate a
/// device that dropped off the network.
#[derive(Debug, Default, Clone)]
pub struct RecordingDevice {
    pub state: Changes,
    pub sent: Vec<Command>,
    pub fail_reads: bool,
    pub fail_writes: bool,
}

impl RecordingDevice {
    pub fn with_state(state: Changes) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    /// The most recent command, if any.
    pub fn last_sent(&self) -> Option<&Command> {
        self.sent.last()
    }
}

impl Device for RecordingDevice {
    fn get_state(
        &mut self,
        dp: &str,
    ) -> Result<Option<DpValue>, Box<dyn std::error::Error + Send + Sync>> {
        if self.fail_reads {
            return Err("device offline".into());
        }
        Ok(self.state.get(dp).cloned())
    }

    fn set_state(
        &mut self,
        dp: &str,
        value: DpValue,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.fail_writes {
            return Err("device offline".into());
        }
        self.state.insert(dp.to_string(), value.clone());
        self.sent.push(Command {
            dp: dp.to_string(),
            value,
        });
        Ok(())
    }
}
