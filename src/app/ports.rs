//! Port traits: the hexagonal boundary between the tag's domain logic and
//! the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (NVS, BLE stack, buzzer/LED, serial log) implement these
//! traits.  The [`AppService`](super::service::AppService) consumes them via
//! generics, so the domain core never touches hardware directly.
//!
//! ## Security notes
//!
//! - The secret under `device-pin` is stored as written; on production
//!   boards put the `alarmtag` namespace on the encrypted NVS partition.
//! - All port errors are typed; callers handle every variant explicitly.

use crate::app::link::Characteristic;

// ───────────────────────────────────────────────────────────────
// Policy store (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Durable key/value store for the policy flags and the device secret.
///
/// Keys live in one namespace fixed at construction.  Writes MUST be atomic:
/// no partial writes on power loss.  The ESP-IDF NVS API guarantees this
/// natively; the in-memory simulation achieves it trivially.
pub trait PolicyStore {
    fn get_u64(&self, key: &str) -> Result<Option<u64>, StorageError>;

    fn put_u64(&mut self, key: &str, value: u64) -> Result<(), StorageError>;

    /// Copy the value of `key` into `buf`.  Returns the value length, or
    /// `None` when the key is absent.
    fn get_bytes(&self, key: &str, buf: &mut [u8]) -> Result<Option<usize>, StorageError>;

    fn put_bytes(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;

    fn contains(&self, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Link transport (driven adapter: domain → BLE stack)
// ───────────────────────────────────────────────────────────────

/// Outgoing half of the wireless link.  Incoming events arrive as
/// [`LinkEvent`](super::link::LinkEvent)s through the event queue.
pub trait LinkTransport {
    /// Replace the readable value of a characteristic.
    fn set_value(&mut self, characteristic: Characteristic, value: &[u8]);

    /// Push the current value to subscribed controllers.
    fn notify(&mut self, characteristic: Characteristic);

    fn start_advertising(&mut self);

    fn stop_advertising(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Alert actuator (driven adapter: domain → buzzer / status LED)
// ───────────────────────────────────────────────────────────────

/// What the status LED shows about the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkIndicator {
    /// Blue blinking.
    Advertising,
    /// Blue steady off.
    Connected,
}

/// Binary outputs of the tag.  Periodic toggling happens behind this port.
pub trait AlertActuator {
    /// Start the periodic buzzer toggle.
    fn arm_alarm(&mut self);

    /// Stop the periodic toggle and force the buzzer to its off level.
    fn disarm_alarm(&mut self);

    fn set_link_indicator(&mut self, indicator: LinkIndicator);

    /// Red LED: lit while the firmware is initialising.
    fn set_boot_indicator(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`PolicyStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Stored value has the wrong type or does not fit the caller's buffer.
    InvalidValue,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::InvalidValue => write!(f, "invalid stored value"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
