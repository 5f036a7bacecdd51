//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them; the firmware logs them to serial.

use crate::alarm::AlarmCause;
use crate::app::link::{Characteristic, PeerAddress};
use crate::error::PolicyError;
use crate::policy::PolicyFlags;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Flags loaded from the store.  `locked` when new sessions need the PIN.
    Booted { flags: PolicyFlags, locked: bool },

    /// A controller connected.
    Connected { peer: PeerAddress, authorized: bool },

    Disconnected,

    /// The presented secret matched; the session is now authorized.
    Unlocked,

    AlarmStarted(AlarmCause),

    AlarmStopped,

    /// A configuration write changed the flags.
    PolicyChanged {
        previous: PolicyFlags,
        current: PolicyFlags,
    },

    /// The pending secret was persisted on lock-enable.
    SecretCommitted,

    /// The stored secret was deleted on lock-disable.
    SecretRemoved,

    /// A controller request was dropped.
    Rejected {
        characteristic: Characteristic,
        error: PolicyError,
    },
}
