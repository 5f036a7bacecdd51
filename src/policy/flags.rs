//! Policy flags and their two encodings.
//!
//! The persisted form is a `u64` bit-vector whose bit positions are fixed
//! forever (existing devices carry them in NVS).  In memory the flags are a
//! struct of named booleans; [`PolicyFlags::from_bits`] and
//! [`PolicyFlags::bits`] are the only places that know the positions.
//!
//! The wire form is the text shown to the controller:
//!
//! ```text
//!   bits 0b01  ──▶  "alarm-on-disconnect:1;device-lock:0;"
//! ```
//!
//! Incoming writes are not parsed field by field.  A write is scanned for
//! the literal directives `<key>:0` / `<key>:1` and the current bit decides
//! which of the two is honoured (see [`Directive::target`]).

use core::fmt::Write;

const ALARM_ON_DISCONNECT_BIT: u64 = 1 << 0;
const DEVICE_LOCK_BIT: u64 = 1 << 1;
const DEFINED_BITS: u64 = ALARM_ON_DISCONNECT_BIT | DEVICE_LOCK_BIT;

const ALARM_ON_DISCONNECT_KEY: &str = "alarm-on-disconnect";
const DEVICE_LOCK_KEY: &str = "device-lock";

/// Longest possible text encoding, rounded up.
pub const FLAGS_TEXT_CAP: usize = 64;

/// Text form of the flags as exposed on the Alert-Policy-Config characteristic.
pub type FlagsText = heapless::String<FLAGS_TEXT_CAP>;

/// Named view of the persisted policy bit-vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyFlags {
    /// Bit 0: arm the alarm when the controller disconnects.
    pub alarm_on_disconnect: bool,
    /// Bit 1: new connections must present the stored secret.
    pub device_lock: bool,
    /// Bits this firmware does not define, carried through untouched.
    reserved: u64,
}

impl PolicyFlags {
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            alarm_on_disconnect: bits & ALARM_ON_DISCONNECT_BIT != 0,
            device_lock: bits & DEVICE_LOCK_BIT != 0,
            reserved: bits & !DEFINED_BITS,
        }
    }

    pub const fn bits(self) -> u64 {
        let mut bits = self.reserved;
        if self.alarm_on_disconnect {
            bits |= ALARM_ON_DISCONNECT_BIT;
        }
        if self.device_lock {
            bits |= DEVICE_LOCK_BIT;
        }
        bits
    }

    /// Render every defined flag as `key:bit;` in bit order.
    pub fn to_text(self) -> FlagsText {
        let mut text = FlagsText::new();
        // Both tokens together are well under FLAGS_TEXT_CAP.
        let _ = write!(
            text,
            "{}:{};{}:{};",
            ALARM_ON_DISCONNECT_KEY,
            u8::from(self.alarm_on_disconnect),
            DEVICE_LOCK_KEY,
            u8::from(self.device_lock),
        );
        text
    }
}

impl Default for PolicyFlags {
    fn default() -> Self {
        Self::from_bits(crate::config::DEFAULT_FLAGS)
    }
}

// ---------------------------------------------------------------------------
// Directive scanning
// ---------------------------------------------------------------------------

/// Which settings of one flag a write mentions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Directive {
    /// The write contains `<key>:0`.
    pub off: bool,
    /// The write contains `<key>:1`.
    pub on: bool,
}

impl Directive {
    fn scan(raw: &[u8], key: &str) -> Self {
        Self {
            off: contains_token(raw, key, b'0'),
            on: contains_token(raw, key, b'1'),
        }
    }

    /// The value this directive moves a flag to, given its current value.
    /// Only the opposite setting is honoured; asking for the current value
    /// is a no-op.
    pub fn target(self, current: bool) -> Option<bool> {
        match (current, self.off, self.on) {
            (true, true, _) => Some(false),
            (false, _, true) => Some(true),
            _ => None,
        }
    }
}

/// Every directive found in one configuration write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Directives {
    pub alarm_on_disconnect: Directive,
    pub device_lock: Directive,
}

impl Directives {
    /// Scan a raw write.  Bytes need not be UTF-8; unknown content is ignored.
    pub fn scan(raw: &[u8]) -> Self {
        Self {
            alarm_on_disconnect: Directive::scan(raw, ALARM_ON_DISCONNECT_KEY),
            device_lock: Directive::scan(raw, DEVICE_LOCK_KEY),
        }
    }

    /// The flags that result from applying these directives to `current`,
    /// ignoring any precondition.  Reserved bits are kept.
    pub fn resolve(self, current: PolicyFlags) -> PolicyFlags {
        PolicyFlags {
            alarm_on_disconnect: self
                .alarm_on_disconnect
                .target(current.alarm_on_disconnect)
                .unwrap_or(current.alarm_on_disconnect),
            device_lock: self
                .device_lock
                .target(current.device_lock)
                .unwrap_or(current.device_lock),
            reserved: current.reserved,
        }
    }

    pub fn is_empty(self) -> bool {
        self == Self::default()
    }
}

fn contains_token(raw: &[u8], key: &str, value: u8) -> bool {
    let key = key.as_bytes();
    let len = key.len() + 2;
    raw.windows(len)
        .any(|w| &w[..key.len()] == key && w[key.len()] == b':' && w[key.len() + 1] == value)
}
