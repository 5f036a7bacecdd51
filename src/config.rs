//! Device configuration parameters
//!
//! Compile-time tunables for the AlarmTag firmware. The policy flags
//! themselves are runtime state and live in NVS, see [`crate::policy`].

/// NVS key holding the policy flags word (u64).
pub const FLAGS_KEY: &str = "flags";
/// NVS key holding the committed device secret.
pub const SECRET_KEY: &str = "device-pin";
/// Flags word used when nothing has been persisted yet:
/// alarm-on-disconnect on, device-lock off.
pub const DEFAULT_FLAGS: u64 = 0b1;

/// Core device configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagConfig {
    // --- BLE ---
    /// Local name used in advertising
    pub device_name: &'static str,
    /// Delay after each notification so the controller is not flooded (ms)
    pub notify_settle_ms: u32,

    // --- Storage ---
    /// NVS namespace for flags and secret
    pub store_namespace: &'static str,

    // --- Power ---
    /// CPU clock set at boot (MHz)
    pub cpu_freq_mhz: u32,

    // --- Timing ---
    /// Buzzer toggle period while the alarm is armed (microseconds)
    pub alarm_toggle_period_us: u64,
    /// Link LED toggle period while advertising (microseconds)
    pub advertising_blink_period_us: u64,
    /// Main loop idle delay between event queue drains (milliseconds)
    pub event_poll_ms: u32,
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            // BLE
            device_name: "AlarmTag",
            notify_settle_ms: 3,

            // Storage
            store_namespace: "alarmtag",

            // Power
            cpu_freq_mhz: 80,

            // Timing
            alarm_toggle_period_us: 100_000,      // 5 Hz beep
            advertising_blink_period_us: 500_000, // 1 Hz blink
            event_poll_ms: 10,
        }
    }
}
