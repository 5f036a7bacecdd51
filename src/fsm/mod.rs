//! Function-pointer finite state machine engine for the controller session.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                            │
//! │  ┌──────────────────────┬──────────┬─────────┬────────────────────────┐│
//! │  │ StateId              │ on_enter │ on_exit │ on_input               ││
//! │  ├──────────────────────┼──────────┼─────────┼────────────────────────┤│
//! │  │ Disconnected         │ fn(ctx)  │ -       │ fn(ctx, in)->Option<>  ││
//! │  │ ConnectedUnauthorized│ fn(ctx)  │ -       │ fn(ctx, in)->Option<>  ││
//! │  │ ConnectedAuthorized  │ fn(ctx)  │ -       │ fn(ctx, in)->Option<>  ││
//! │  └──────────────────────┴──────────┴─────────┴────────────────────────┘│
//! └────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine is driven by [`SessionInput`]s rather than a clock.  For each
//! input it calls `on_input` for the **current** state; `Some(next_id)`
//! runs `on_exit` for the current state, then `on_enter` for the next, and
//! moves the current pointer.  Inputs a state does not care about return
//! `None` and leave everything untouched.

pub mod context;
pub mod states;

use context::SessionContext;
use log::{debug, info};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Every session state.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Disconnected = 0,
    ConnectedUnauthorized = 1,
    ConnectedAuthorized = 2,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 3;

    /// Convert a table index back to `StateId`.  Panics on out-of-range in
    /// debug builds; returns `Disconnected` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Disconnected,
            1 => Self::ConnectedUnauthorized,
            2 => Self::ConnectedAuthorized,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Disconnected
            }
        }
    }

    pub fn is_connected(self) -> bool {
        self != Self::Disconnected
    }

    pub fn is_authorized(self) -> bool {
        self == Self::ConnectedAuthorized
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// What the session machine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInput {
    /// A controller connected.  `lock_engaged` is true when device-lock is
    /// set **and** a secret is stored.
    Connect { lock_engaged: bool },
    Disconnect,
    /// The authorization gate accepted the presented secret.
    SecretAccepted,
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut SessionContext);

/// Signature for the input handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateInputFn = fn(&mut SessionContext, &SessionInput) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single session state.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_input: StateInputFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The session state machine.
pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    /// Index of the currently active state.
    current: usize,
    /// Number of transitions taken since start (wraps).
    transitions: u32,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
            transitions: 0,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `dispatch()`.
    pub fn start(&mut self, ctx: &mut SessionContext) {
        info!("session: starting in {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Feed one input to the current state.  Returns the new state when a
    /// transition happened.
    pub fn dispatch(&mut self, input: &SessionInput, ctx: &mut SessionContext) -> Option<StateId> {
        let next = (self.table[self.current].on_input)(ctx, input);
        match next {
            Some(next_id) => {
                self.transition(next_id, ctx);
                Some(next_id)
            }
            None => {
                debug!(
                    "session: {:?} ignored in {}",
                    input, self.table[self.current].name
                );
                None
            }
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut SessionContext) {
        let next_idx = next_id as usize;

        info!(
            "session: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.transitions = self.transitions.wrapping_add(1);

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
