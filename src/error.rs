//! Unified error types for the AlarmTag firmware.
//!
//! [`PolicyError`] is the domain taxonomy: every rejected controller request
//! maps to exactly one variant.  None of them is ever reported back over the
//! link; the request is logged and dropped.  [`Error`] wraps the domain and
//! infrastructure errors so bootstrap code can handle them uniformly.

use core::fmt;

use crate::adapters::ble::LinkError;
use crate::app::ports::StorageError;
use crate::drivers::hw_init::HwInitError;

// ---------------------------------------------------------------------------
// Domain errors
// ---------------------------------------------------------------------------

/// Why a controller request was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyError {
    /// A gated write arrived while the session is not authorized.
    Unauthorized,
    /// A flag change conflicts with a precondition.
    /// The `&'static str` names the precondition.
    InvalidTransition(&'static str),
    /// The presented secret does not match the stored one.
    AuthFailure,
}

impl fmt::Display for PolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "required pin"),
            Self::InvalidTransition(why) => write!(f, "invalid transition: {why}"),
            Self::AuthFailure => write!(f, "wrong pin"),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    Policy(PolicyError),
    Storage(StorageError),
    Link(LinkError),
    Init(HwInitError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Policy(e) => write!(f, "policy: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Init(e) => write!(f, "init: {e}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<PolicyError> for Error {
    fn from(e: PolicyError) -> Self {
        Self::Policy(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

impl From<HwInitError> for Error {
    fn from(e: HwInitError) -> Self {
        Self::Init(e)
    }
}

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
