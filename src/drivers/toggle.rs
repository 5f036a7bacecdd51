//! Periodic output toggles.
//!
//! A [`PeriodicToggle`] is shared between the main task, which enables and
//! disables it, and a hardware timer callback, which calls
//! [`tick`](PeriodicToggle::tick) every period and drives the pin with the
//! returned level.  Both sides only touch atomics.

use core::sync::atomic::{AtomicBool, Ordering};

pub struct PeriodicToggle {
    enabled: AtomicBool,
    level: AtomicBool,
}

impl PeriodicToggle {
    pub const fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            level: AtomicBool::new(false),
        }
    }

    /// Enable or disable toggling.  Disabling resets the phase so the next
    /// enable starts with an active half-period.
    pub fn set_enabled(&self, enabled: bool) {
        if !enabled {
            self.level.store(false, Ordering::Release);
        }
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Advance one half-period.  Returns the new level (`true` = active) or
    /// `None` while disabled, in which case the pin must be left alone.
    pub fn tick(&self) -> Option<bool> {
        if !self.enabled.load(Ordering::Acquire) {
            return None;
        }
        Some(!self.level.fetch_xor(true, Ordering::AcqRel))
    }
}

impl Default for PeriodicToggle {
    fn default() -> Self {
        Self::new()
    }
}

/// Buzzer toggle, 100 ms half-period while the alarm is armed.
pub static ALARM_TOGGLE: PeriodicToggle = PeriodicToggle::new();

/// Blue LED toggle, 500 ms half-period while advertising.
pub static ADVERTISING_BLINK: PeriodicToggle = PeriodicToggle::new();
