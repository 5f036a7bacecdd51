//! Authorization gate: device PIN check and secret staging.
//!
//! The gate keeps two secrets:
//!
//! * **stored**: mirror of `device-pin` in NVS, loaded at boot and kept in
//!   sync by the service whenever it commits or removes the key;
//! * **pending**: the most recent non-empty value written to PIN-Auth.
//!   It becomes the stored secret when the controller enables device-lock.
//!
//! Every non-empty submission is staged, including failed unlock attempts.
//! Comparison runs over the full length of both secrets so the time taken
//! does not reveal the length of the matching prefix.

use log::{debug, warn};

use crate::app::link::MAX_WRITE_LEN;
use crate::error::PolicyError;

/// Largest secret, in bytes.  Any write the link accepts fits.
pub const MAX_SECRET_LEN: usize = MAX_WRITE_LEN;

/// Raw secret bytes.  Not required to be UTF-8.
pub type Secret = heapless::Vec<u8, MAX_SECRET_LEN>;

/// Result of a secret submission that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The session was unauthorized and the secret matched.
    Unlocked,
    /// The session was already authorized; the secret was only staged.
    Staged,
}

#[derive(Default)]
pub struct AuthorizationGate {
    stored: Option<Secret>,
    pending: Option<Secret>,
}

impl AuthorizationGate {
    /// `stored` is the secret currently persisted under `device-pin`.
    pub fn new(stored: Option<Secret>) -> Self {
        Self {
            stored,
            pending: None,
        }
    }

    /// Handle a PIN-Auth write.
    ///
    /// When `authorized` is false the bytes are checked against the stored
    /// secret; `Ok(Unlocked)` means the session may be promoted.
    pub fn submit_secret(
        &mut self,
        raw: &[u8],
        authorized: bool,
    ) -> Result<AuthOutcome, PolicyError> {
        let Ok(presented) = Secret::from_slice(raw) else {
            // The older staged secret must not survive a newer submission.
            warn!(
                "auth: secret of {} bytes exceeds {} byte limit, pending secret cleared",
                raw.len(),
                MAX_SECRET_LEN
            );
            self.pending = None;
            return Err(PolicyError::AuthFailure);
        };

        let outcome = if authorized {
            Ok(AuthOutcome::Staged)
        } else if self
            .stored
            .as_ref()
            .is_some_and(|stored| secrets_match(stored, &presented))
        {
            Ok(AuthOutcome::Unlocked)
        } else {
            Err(PolicyError::AuthFailure)
        };

        if !presented.is_empty() {
            debug!("auth: staged {} byte secret", presented.len());
            self.pending = Some(presented);
        }
        outcome
    }

    /// Secret to commit on the next lock-enable.
    pub fn pending(&self) -> Option<&Secret> {
        self.pending.as_ref()
    }

    pub fn has_stored(&self) -> bool {
        self.stored.is_some()
    }

    /// Record that `secret` is now persisted under `device-pin`.
    pub fn commit(&mut self, secret: Secret) {
        self.stored = Some(secret);
    }

    /// Record that `device-pin` was removed from the store.
    pub fn forget_stored(&mut self) {
        self.stored = None;
    }
}

fn secrets_match(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());
    let mut diff = u8::from(a.len() != b.len());
    for i in 0..len {
        diff |= a.get(i).copied().unwrap_or(0) ^ b.get(i).copied().unwrap_or(0);
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> Secret {
        Secret::from_slice(s.as_bytes()).unwrap()
    }

    #[test]
    fn correct_pin_unlocks() {
        let mut gate = AuthorizationGate::new(Some(secret("1234")));
        assert_eq!(gate.submit_secret(b"1234", false), Ok(AuthOutcome::Unlocked));
    }

    #[test]
    fn wrong_pin_fails_but_is_staged() {
        let mut gate = AuthorizationGate::new(Some(secret("1234")));
        assert_eq!(gate.submit_secret(b"wrong", false), Err(PolicyError::AuthFailure));
        assert_eq!(gate.pending(), Some(&secret("wrong")));
    }

    #[test]
    fn no_stored_secret_always_fails() {
        let mut gate = AuthorizationGate::new(None);
        assert_eq!(gate.submit_secret(b"", false), Err(PolicyError::AuthFailure));
        assert_eq!(gate.submit_secret(b"1234", false), Err(PolicyError::AuthFailure));
    }

    #[test]
    fn empty_submission_keeps_previous_pending() {
        let mut gate = AuthorizationGate::new(None);
        gate.submit_secret(b"9999", true).unwrap();
        gate.submit_secret(b"", true).unwrap();
        assert_eq!(gate.pending(), Some(&secret("9999")));
    }

    #[test]
    fn authorized_submission_only_stages() {
        let mut gate = AuthorizationGate::new(Some(secret("1234")));
        assert_eq!(gate.submit_secret(b"5678", true), Ok(AuthOutcome::Staged));
        assert_eq!(gate.pending(), Some(&secret("5678")));
    }

    #[test]
    fn prefix_and_extension_do_not_match() {
        let mut gate = AuthorizationGate::new(Some(secret("1234")));
        assert!(gate.submit_secret(b"123", false).is_err());
        assert!(gate.submit_secret(b"12345", false).is_err());
        assert!(gate.submit_secret(b"1234\0", false).is_err());
    }

    #[test]
    fn oversized_secret_is_neither_checked_nor_staged() {
        let mut gate = AuthorizationGate::new(Some(secret("1234")));
        let long = [b'1'; MAX_SECRET_LEN + 1];
        assert_eq!(gate.submit_secret(&long, false), Err(PolicyError::AuthFailure));
        assert!(gate.pending().is_none());
    }

    #[test]
    fn oversized_secret_clears_earlier_pending() {
        let mut gate = AuthorizationGate::new(None);
        gate.submit_secret(b"1234", true).unwrap();
        let long = [b'7'; MAX_SECRET_LEN + 1];
        assert_eq!(gate.submit_secret(&long, true), Err(PolicyError::AuthFailure));
        assert!(gate.pending().is_none());
    }

    #[test]
    fn long_secret_replaces_earlier_pending() {
        let mut gate = AuthorizationGate::new(None);
        gate.submit_secret(b"1234", true).unwrap();
        let long = [b'7'; 40];
        assert_eq!(gate.submit_secret(&long, true), Ok(AuthOutcome::Staged));
        assert_eq!(gate.pending().map(|s| s.as_slice()), Some(&long[..]));
    }

    #[test]
    fn commit_and_forget_track_store() {
        let mut gate = AuthorizationGate::new(None);
        gate.commit(secret("1"));
        assert!(gate.has_stored());
        assert_eq!(gate.submit_secret(b"1", false), Ok(AuthOutcome::Unlocked));
        gate.forget_stored();
        assert!(!gate.has_stored());
    }

    #[test]
    fn secrets_match_is_exact() {
        assert!(secrets_match(b"abc", b"abc"));
        assert!(secrets_match(b"", b""));
        assert!(!secrets_match(b"abc", b"abd"));
        assert!(!secrets_match(b"abc", b"ab"));
        assert!(!secrets_match(&[0], b""));
    }
}
