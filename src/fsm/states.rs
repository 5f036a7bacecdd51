//! Session state handlers and table builder.
//!
//! ```text
//!                    Connect{lock_engaged: true}
//!  DISCONNECTED ─────────────────────────────▶ CONNECTED_UNAUTHORIZED
//!     ▲  │                                          │
//!     │  │ Connect{lock_engaged: false}             │ SecretAccepted
//!     │  ▼                                          ▼
//!     │  CONNECTED_AUTHORIZED ◀──────────────────────┘
//!     │        │
//!     └────────┴──── Disconnect (from either connected state)
//! ```

use super::context::SessionContext;
use super::{SessionInput, StateDescriptor, StateId};
use log::info;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Disconnected
        StateDescriptor {
            id: StateId::Disconnected,
            name: "Disconnected",
            on_enter: Some(disconnected_enter),
            on_exit: None,
            on_input: disconnected_input,
        },
        // Index 1: ConnectedUnauthorized
        StateDescriptor {
            id: StateId::ConnectedUnauthorized,
            name: "ConnectedUnauthorized",
            on_enter: Some(unauthorized_enter),
            on_exit: None,
            on_input: unauthorized_input,
        },
        // Index 2: ConnectedAuthorized
        StateDescriptor {
            id: StateId::ConnectedAuthorized,
            name: "ConnectedAuthorized",
            on_enter: Some(authorized_enter),
            on_exit: None,
            on_input: authorized_input,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  DISCONNECTED
// ═══════════════════════════════════════════════════════════════════════════

fn disconnected_enter(ctx: &mut SessionContext) {
    ctx.reset();
}

fn disconnected_input(_ctx: &mut SessionContext, input: &SessionInput) -> Option<StateId> {
    match *input {
        SessionInput::Connect { lock_engaged: true } => Some(StateId::ConnectedUnauthorized),
        SessionInput::Connect { lock_engaged: false } => Some(StateId::ConnectedAuthorized),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONNECTED_UNAUTHORIZED: waiting for the device PIN
// ═══════════════════════════════════════════════════════════════════════════

fn unauthorized_enter(ctx: &mut SessionContext) {
    ctx.connected = true;
    ctx.authorized = false;
    info!("auth: required pin");
}

fn unauthorized_input(_ctx: &mut SessionContext, input: &SessionInput) -> Option<StateId> {
    match input {
        SessionInput::SecretAccepted => Some(StateId::ConnectedAuthorized),
        SessionInput::Disconnect => Some(StateId::Disconnected),
        SessionInput::Connect { .. } => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONNECTED_AUTHORIZED
// ═══════════════════════════════════════════════════════════════════════════

fn authorized_enter(ctx: &mut SessionContext) {
    ctx.connected = true;
    ctx.authorized = true;
}

fn authorized_input(_ctx: &mut SessionContext, input: &SessionInput) -> Option<StateId> {
    match input {
        SessionInput::Disconnect => Some(StateId::Disconnected),
        _ => None,
    }
}
