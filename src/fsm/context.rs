//! Session snapshot threaded through every state handler.
//!
//! State handlers write it in their `on_enter` hooks; the rest of the
//! firmware only reads it.

/// `{connected, authorized}` for the single modelled controller.
/// `authorized` implies `connected`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub connected: bool,
    pub authorized: bool,
}

impl SessionContext {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
