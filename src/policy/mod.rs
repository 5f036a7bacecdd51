//! Policy engine. Owns the flags word and validates configuration writes.
//!
//! ```text
//!   raw write ──▶ authorized? ──▶ Directives::scan ──▶ resolve ──▶ lock precondition
//!                     │ no                                              │ fails
//!                     ▼                                                 ▼
//!               Unauthorized                                 InvalidTransition
//! ```
//!
//! A write is all-or-nothing: when the device-lock precondition fails, no
//! other directive in the same write is applied either.  The engine only
//! decides; persisting the flags and the secret is left to the caller via
//! the returned [`PolicyChange`].

pub mod flags;

use log::debug;

use crate::auth::Secret;
use crate::error::PolicyError;

pub use flags::{Directives, FlagsText, PolicyFlags};

/// What happens to the stored secret as part of a flag change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretChange {
    Unchanged,
    /// Device-lock was enabled: persist this secret.
    Commit(Secret),
    /// Device-lock was disabled: delete the stored secret.
    Remove,
}

/// An accepted configuration write.  `previous == current` when the write
/// asked for the values already in effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyChange {
    pub previous: PolicyFlags,
    pub current: PolicyFlags,
    pub secret: SecretChange,
}

impl PolicyChange {
    pub fn is_change(&self) -> bool {
        self.previous != self.current
    }
}

pub struct PolicyEngine {
    flags: PolicyFlags,
}

impl PolicyEngine {
    pub fn new(flags: PolicyFlags) -> Self {
        Self { flags }
    }

    pub fn flags(&self) -> PolicyFlags {
        self.flags
    }

    /// Text for the Alert-Policy-Config characteristic.  No side effects.
    pub fn read(&self) -> FlagsText {
        self.flags.to_text()
    }

    /// Apply a configuration write from the controller.
    ///
    /// * `authorized`: current session authorization.
    /// * `pending`: the secret staged by the authorization gate, if any.
    ///
    /// Every accepted write yields a [`PolicyChange`], including one that
    /// leaves the flags as they were.
    pub fn apply_write(
        &mut self,
        raw: &[u8],
        authorized: bool,
        pending: Option<&Secret>,
    ) -> Result<PolicyChange, PolicyError> {
        if !authorized {
            return Err(PolicyError::Unauthorized);
        }

        let previous = self.flags;
        let current = Directives::scan(raw).resolve(previous);

        let secret = match (previous.device_lock, current.device_lock) {
            (false, true) => match pending {
                Some(secret) if !secret.is_empty() => SecretChange::Commit(secret.clone()),
                _ => {
                    return Err(PolicyError::InvalidTransition(
                        "required pin before enabling the lock",
                    ));
                }
            },
            (true, false) => SecretChange::Remove,
            _ => SecretChange::Unchanged,
        };

        if current == previous {
            debug!("policy: write changed nothing ({} bytes)", raw.len());
        }

        self.flags = current;
        Ok(PolicyChange {
            previous,
            current,
            secret,
        })
    }

    /// Whether a dropped link should arm the alarm.
    pub fn alarm_on_disconnect(&self) -> bool {
        self.flags.alarm_on_disconnect
    }

    /// Whether a new connection must present the stored secret.
    /// `secret_stored` is the presence of `device-pin` in the store.
    pub fn lock_engaged(&self, secret_stored: bool) -> bool {
        self.flags.device_lock && secret_stored
    }
}
