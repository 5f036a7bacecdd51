//! Typed inbound link events and the GATT layout of the tag.
//!
//! The BLE adapter turns stack callbacks into [`LinkEvent`]s; everything
//! downstream only ever sees this enum.

/// 48-bit Bluetooth device address, most significant byte first.
pub type PeerAddress = [u8; 6];

/// Largest characteristic write the tag accepts.
pub const MAX_WRITE_LEN: usize = 128;

/// Raw bytes of one characteristic write.
pub type Payload = heapless::Vec<u8, MAX_WRITE_LEN>;

// ---------------------------------------------------------------------------
// GATT identifiers
// ---------------------------------------------------------------------------

pub const SERVICE_UUID: u128 = 0x4ac6_a418_d0eb_4016_a8a7_0904_67c9_cf1c;
pub const ALERT_POLICY_CONFIG_UUID: u128 = 0x1544_56ac_0b87_4c7e_a716_3ebf_0055_262d;
pub const MAKE_ALERT_UUID: u128 = 0xe75b_30ba_c8eb_4d65_9239_02a8_a787_7a1d;
pub const PIN_AUTH_UUID: u128 = 0xd258_22e9_eba6_4d27_8f03_179a_03e5_88ab;

/// GATT access flags of a characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
}

/// The three characteristics of the AlarmTag service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Characteristic {
    /// Policy flags as `key:bit;` text.
    AlertPolicyConfig,
    /// One-byte alarm toggle.
    MakeAlert,
    /// Device PIN, to unlock or to stage.
    PinAuth,
}

impl Characteristic {
    pub const ALL: [Self; 3] = [Self::AlertPolicyConfig, Self::MakeAlert, Self::PinAuth];

    pub const fn uuid(self) -> u128 {
        match self {
            Self::AlertPolicyConfig => ALERT_POLICY_CONFIG_UUID,
            Self::MakeAlert => MAKE_ALERT_UUID,
            Self::PinAuth => PIN_AUTH_UUID,
        }
    }

    pub fn from_uuid(uuid: u128) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.uuid() == uuid)
    }

    pub const fn access(self) -> Access {
        match self {
            Self::AlertPolicyConfig => Access {
                read: true,
                write: true,
                notify: true,
            },
            Self::MakeAlert | Self::PinAuth => Access {
                read: false,
                write: true,
                notify: false,
            },
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::AlertPolicyConfig => "alert-policy-config",
            Self::MakeAlert => "make-alert",
            Self::PinAuth => "pin-auth",
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Everything the link delivers to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Connected { peer: PeerAddress },
    Disconnected,
    Written {
        characteristic: Characteristic,
        bytes: Payload,
    },
}

impl LinkEvent {
    /// Build a write event.  Returns `None` when `bytes` exceeds
    /// [`MAX_WRITE_LEN`].
    pub fn written(characteristic: Characteristic, bytes: &[u8]) -> Option<Self> {
        Payload::from_slice(bytes).ok().map(|bytes| Self::Written {
            characteristic,
            bytes,
        })
    }
}
