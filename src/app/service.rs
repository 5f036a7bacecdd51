//! Application service: the hexagonal core of the tag.
//!
//! [`AppService`] owns the session FSM, policy engine, authorization gate
//! and alarm controller.  Link events go through [`AppService::handle`],
//! a pure function of (state, event) that returns [`Effects`];
//! [`AppService::dispatch`] applies those effects to the ports.
//!
//! ```text
//!                    ┌─────────────────────────────┐ ──▶ LinkTransport
//!  LinkEvent ──────▶ │         AppService          │ ──▶ AlertActuator
//!                    │ Session · Policy · Auth ·   │ ──▶ PolicyStore
//!                    │ Alarm                       │ ──▶ EventSink
//!                    └─────────────────────────────┘
//! ```

use log::{debug, error, info, warn};

use crate::alarm::{self, AlarmCause, AlarmController, AlarmTransition};
use crate::auth::{AuthOutcome, AuthorizationGate, MAX_SECRET_LEN, Secret};
use crate::config::{FLAGS_KEY, SECRET_KEY};
use crate::fsm::context::SessionContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, SessionInput, StateId};
use crate::policy::{FlagsText, PolicyEngine, PolicyFlags, SecretChange};

use super::effects::{Effect, Effects, push};
use super::events::AppEvent;
use super::link::{Characteristic, LinkEvent, PeerAddress};
use super::ports::{AlertActuator, EventSink, LinkIndicator, LinkTransport, PolicyStore};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService {
    fsm: Fsm,
    session: SessionContext,
    policy: PolicyEngine,
    gate: AuthorizationGate,
    alarm: AlarmController,
}

impl AppService {
    /// Construct the service from already-loaded state.
    ///
    /// Does **not** touch any port; [`boot`](Self::boot) is the usual entry.
    pub fn new(flags: PolicyFlags, stored_secret: Option<Secret>) -> Self {
        let mut fsm = Fsm::new(build_state_table(), StateId::Disconnected);
        let mut session = SessionContext::default();
        fsm.start(&mut session);
        Self {
            fsm,
            session,
            policy: PolicyEngine::new(flags),
            gate: AuthorizationGate::new(stored_secret),
            alarm: AlarmController::new(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load flags and the stored secret, falling back to defaults when the
    /// store is empty or unreadable.
    pub fn boot(store: &impl PolicyStore, sink: &mut impl EventSink) -> Self {
        let flags = match store.get_u64(FLAGS_KEY) {
            Ok(Some(bits)) => PolicyFlags::from_bits(bits),
            Ok(None) => {
                info!("config: no stored flags, using defaults");
                PolicyFlags::default()
            }
            Err(e) => {
                warn!("config: reading flags failed ({}), using defaults", e);
                PolicyFlags::default()
            }
        };

        let service = Self::new(flags, load_secret(store));
        sink.emit(&AppEvent::Booted {
            flags,
            locked: service.policy.lock_engaged(service.gate.has_stored()),
        });
        service
    }

    /// Put the outputs in their idle state and open the link for
    /// controllers.  Ends the boot indication.
    pub fn start(
        &mut self,
        link: &mut impl LinkTransport,
        alert: &mut impl AlertActuator,
        sink: &mut impl EventSink,
    ) {
        let mut effects = Effects::new();
        push(&mut effects, Effect::DisarmAlarm);
        push(
            &mut effects,
            Effect::SetValue {
                characteristic: Characteristic::AlertPolicyConfig,
                value: self.policy.read(),
            },
        );
        push(&mut effects, Effect::StartAdvertising);
        push(&mut effects, Effect::Indicator(LinkIndicator::Advertising));

        for effect in effects {
            apply_output(effect, link, alert, sink);
        }
        alert.set_boot_indicator(false);
        info!("AppService started, advertising");
    }

    // ── Event handling ────────────────────────────────────────

    /// Handle one link event and apply the resulting effects.
    ///
    /// Storage failures are logged.  Once one storage effect of an event
    /// fails, the remaining storage effects of that event are skipped so a
    /// flags word with device-lock set never lands without its secret.
    pub fn dispatch(
        &mut self,
        event: LinkEvent,
        store: &mut impl PolicyStore,
        link: &mut impl LinkTransport,
        alert: &mut impl AlertActuator,
        sink: &mut impl EventSink,
    ) {
        let mut storage_ok = true;
        for effect in self.handle(event) {
            if !effect.is_storage() {
                apply_output(effect, link, alert, sink);
                continue;
            }
            if !storage_ok {
                warn!("storage: skipped {:?} after earlier failure", effect);
                continue;
            }
            if let Err(e) = apply_storage(&effect, store) {
                error!("storage: {:?} failed: {}", effect, e);
                storage_ok = false;
            }
        }
    }

    /// Decide the effects of one link event.  Mutates only in-memory state.
    pub fn handle(&mut self, event: LinkEvent) -> Effects {
        let mut effects = Effects::new();
        match event {
            LinkEvent::Connected { peer } => self.on_connected(peer, &mut effects),
            LinkEvent::Disconnected => self.on_disconnected(&mut effects),
            LinkEvent::Written {
                characteristic,
                bytes,
            } => {
                if !self.session.connected {
                    debug!("link: {} write outside a session ignored", characteristic.name());
                    return effects;
                }
                match characteristic {
                    Characteristic::AlertPolicyConfig => self.on_policy_write(&bytes, &mut effects),
                    Characteristic::MakeAlert => self.on_make_alert(&bytes, &mut effects),
                    Characteristic::PinAuth => self.on_pin_auth(&bytes, &mut effects),
                }
            }
        }
        effects
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn session(&self) -> SessionContext {
        self.session
    }

    pub fn flags(&self) -> PolicyFlags {
        self.policy.flags()
    }

    /// Current Alert-Policy-Config text.  No side effects.
    pub fn policy_text(&self) -> FlagsText {
        self.policy.read()
    }

    pub fn is_armed(&self) -> bool {
        self.alarm.is_armed()
    }

    pub fn pending_secret(&self) -> Option<&Secret> {
        self.gate.pending()
    }

    pub fn has_stored_secret(&self) -> bool {
        self.gate.has_stored()
    }

    // ── Handlers ──────────────────────────────────────────────

    fn on_connected(&mut self, peer: PeerAddress, effects: &mut Effects) {
        if self.session.connected {
            warn!("link: connect while a controller is connected, ignored");
            return;
        }
        let lock_engaged = self.policy.lock_engaged(self.gate.has_stored());
        self.fsm
            .dispatch(&SessionInput::Connect { lock_engaged }, &mut self.session);

        push(effects, Effect::StopAdvertising);
        push(effects, Effect::Indicator(LinkIndicator::Connected));
        push(
            effects,
            Effect::Emit(AppEvent::Connected {
                peer,
                authorized: self.session.authorized,
            }),
        );
    }

    fn on_disconnected(&mut self, effects: &mut Effects) {
        if self
            .fsm
            .dispatch(&SessionInput::Disconnect, &mut self.session)
            .is_some()
        {
            push(effects, Effect::Emit(AppEvent::Disconnected));
            if self.policy.alarm_on_disconnect() {
                self.start_alarm(AlarmCause::Disconnect, effects);
            }
        }
        push(effects, Effect::StartAdvertising);
        push(effects, Effect::Indicator(LinkIndicator::Advertising));
    }

    fn on_policy_write(&mut self, raw: &[u8], effects: &mut Effects) {
        let change = match self
            .policy
            .apply_write(raw, self.session.authorized, self.gate.pending())
        {
            Ok(change) => change,
            Err(error) => {
                push(
                    effects,
                    Effect::Emit(AppEvent::Rejected {
                        characteristic: Characteristic::AlertPolicyConfig,
                        error,
                    }),
                );
                return;
            }
        };

        // Every accepted write is acknowledged with a notification, even
        // when it asked for the values already in effect.
        push(
            effects,
            Effect::SetValue {
                characteristic: Characteristic::AlertPolicyConfig,
                value: self.policy.read(),
            },
        );
        push(effects, Effect::Notify(Characteristic::AlertPolicyConfig));

        if !change.is_change() {
            return;
        }

        let bits = change.current.bits();
        match change.secret {
            SecretChange::Commit(secret) => {
                // Secret before flags: device-lock never persists alone.
                self.gate.commit(secret.clone());
                push(effects, Effect::StoreSecret(secret));
                push(effects, Effect::PersistFlags(bits));
                push(effects, Effect::Emit(AppEvent::SecretCommitted));
            }
            SecretChange::Remove => {
                self.gate.forget_stored();
                push(effects, Effect::PersistFlags(bits));
                push(effects, Effect::RemoveSecret);
                push(effects, Effect::Emit(AppEvent::SecretRemoved));
            }
            SecretChange::Unchanged => push(effects, Effect::PersistFlags(bits)),
        }

        push(
            effects,
            Effect::Emit(AppEvent::PolicyChanged {
                previous: change.previous,
                current: change.current,
            }),
        );
    }

    fn on_make_alert(&mut self, raw: &[u8], effects: &mut Effects) {
        if self.session.authorized && !alarm::is_toggle_request(raw) {
            debug!("alarm: ignored make-alert payload of {} bytes", raw.len());
            return;
        }
        match self.alarm.toggle(self.session.authorized) {
            Ok(AlarmTransition::Started) => {
                push(effects, Effect::ArmAlarm);
                push(effects, Effect::Emit(AppEvent::AlarmStarted(AlarmCause::Controller)));
            }
            Ok(AlarmTransition::Stopped) => {
                push(effects, Effect::DisarmAlarm);
                push(effects, Effect::Emit(AppEvent::AlarmStopped));
            }
            Ok(AlarmTransition::AlreadyArmed) => {}
            Err(error) => push(
                effects,
                Effect::Emit(AppEvent::Rejected {
                    characteristic: Characteristic::MakeAlert,
                    error,
                }),
            ),
        }
    }

    fn on_pin_auth(&mut self, raw: &[u8], effects: &mut Effects) {
        match self.gate.submit_secret(raw, self.session.authorized) {
            Ok(AuthOutcome::Unlocked) => {
                self.fsm
                    .dispatch(&SessionInput::SecretAccepted, &mut self.session);
                push(effects, Effect::Emit(AppEvent::Unlocked));
            }
            Ok(AuthOutcome::Staged) => debug!("auth: secret staged"),
            Err(error) => push(
                effects,
                Effect::Emit(AppEvent::Rejected {
                    characteristic: Characteristic::PinAuth,
                    error,
                }),
            ),
        }
    }

    fn start_alarm(&mut self, cause: AlarmCause, effects: &mut Effects) {
        if self.alarm.start() == AlarmTransition::Started {
            push(effects, Effect::ArmAlarm);
            push(effects, Effect::Emit(AppEvent::AlarmStarted(cause)));
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Effect application
// ───────────────────────────────────────────────────────────────

fn apply_output(
    effect: Effect,
    link: &mut impl LinkTransport,
    alert: &mut impl AlertActuator,
    sink: &mut impl EventSink,
) {
    match effect {
        Effect::SetValue {
            characteristic,
            value,
        } => link.set_value(characteristic, value.as_bytes()),
        Effect::Notify(characteristic) => link.notify(characteristic),
        Effect::ArmAlarm => alert.arm_alarm(),
        Effect::DisarmAlarm => alert.disarm_alarm(),
        Effect::StartAdvertising => link.start_advertising(),
        Effect::StopAdvertising => link.stop_advertising(),
        Effect::Indicator(indicator) => alert.set_link_indicator(indicator),
        Effect::Emit(event) => sink.emit(&event),
        Effect::PersistFlags(_) | Effect::StoreSecret(_) | Effect::RemoveSecret => {}
    }
}

fn apply_storage(
    effect: &Effect,
    store: &mut impl PolicyStore,
) -> Result<(), crate::app::ports::StorageError> {
    match effect {
        Effect::PersistFlags(bits) => store.put_u64(FLAGS_KEY, *bits),
        Effect::StoreSecret(secret) => store.put_bytes(SECRET_KEY, secret),
        Effect::RemoveSecret => store.remove(SECRET_KEY),
        _ => Ok(()),
    }
}

fn load_secret(store: &impl PolicyStore) -> Option<Secret> {
    let mut buf = [0u8; MAX_SECRET_LEN];
    match store.get_bytes(SECRET_KEY, &mut buf) {
        Ok(Some(0)) => {
            warn!("auth: stored secret is empty, ignored");
            None
        }
        Ok(Some(len)) => Secret::from_slice(&buf[..len.min(MAX_SECRET_LEN)]).ok(),
        Ok(None) => None,
        Err(e) => {
            warn!("auth: reading stored secret failed ({})", e);
            None
        }
    }
}
