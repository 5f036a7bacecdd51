//! Alarm controller.
//!
//! Tracks whether the alarm is armed.  The controller never touches the
//! buzzer itself; callers turn the returned [`AlarmTransition`] into
//! actuator calls.

use log::debug;

use crate::error::PolicyError;

/// Who asked for the alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmCause {
    /// Make-Alert write from an authorized controller.
    Controller,
    /// The link dropped with alarm-on-disconnect set.
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmTransition {
    Started,
    Stopped,
    /// `start` while already armed.  Nothing to drive.
    AlreadyArmed,
}

#[derive(Debug, Default)]
pub struct AlarmController {
    armed: bool,
}

impl AlarmController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Flip the alarm.  Only an authorized controller may do this.
    pub fn toggle(&mut self, authorized: bool) -> Result<AlarmTransition, PolicyError> {
        if !authorized {
            return Err(PolicyError::Unauthorized);
        }
        if self.armed {
            Ok(self.stop())
        } else {
            Ok(self.start())
        }
    }

    /// Ensure the alarm is armed.
    pub fn start(&mut self) -> AlarmTransition {
        if self.armed {
            debug!("alarm: start requested while armed");
            return AlarmTransition::AlreadyArmed;
        }
        self.armed = true;
        AlarmTransition::Started
    }

    pub fn stop(&mut self) -> AlarmTransition {
        self.armed = false;
        AlarmTransition::Stopped
    }
}

/// Make-Alert accepts exactly one byte, either ASCII `'1'` or binary `1`.
pub fn is_toggle_request(raw: &[u8]) -> bool {
    matches!(raw, [b'1'] | [1])
}
