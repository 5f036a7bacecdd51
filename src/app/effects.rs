//! Effects produced by the pure event handler.
//!
//! [`AppService::handle`](super::service::AppService::handle) never touches
//! a port.  It returns an ordered list of [`Effect`]s which
//! [`AppService::dispatch`](super::service::AppService::dispatch) then
//! applies.  Tests can assert on the list directly.

use log::warn;

use crate::app::events::AppEvent;
use crate::app::link::Characteristic;
use crate::app::ports::LinkIndicator;
use crate::auth::Secret;
use crate::policy::FlagsText;

/// One action for the outside world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Replace a characteristic's readable value.
    SetValue {
        characteristic: Characteristic,
        value: FlagsText,
    },
    Notify(Characteristic),
    /// Persist the flags word under `flags`.
    PersistFlags(u64),
    /// Persist the secret under `device-pin`.
    StoreSecret(Secret),
    /// Delete `device-pin`.
    RemoveSecret,
    ArmAlarm,
    DisarmAlarm,
    StartAdvertising,
    StopAdvertising,
    Indicator(LinkIndicator),
    Emit(AppEvent),
}

impl Effect {
    /// Effects that write the policy store.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Self::PersistFlags(_) | Self::StoreSecret(_) | Self::RemoveSecret
        )
    }
}

/// Upper bound on effects from a single event.
pub const MAX_EFFECTS: usize = 8;

/// Ordered effects of one event.
pub type Effects = heapless::Vec<Effect, MAX_EFFECTS>;

pub(crate) fn push(effects: &mut Effects, effect: Effect) {
    if let Err(dropped) = effects.push(effect) {
        warn!("effects: list full, dropped {:?}", dropped);
    }
}
