//! Session lifecycle through `AppService::dispatch`: boot, connect,
//! authorization, alarm, disconnect.

use alarmtag::adapters::ble::BleLink;
use alarmtag::adapters::log_sink::LogEventSink;
use alarmtag::adapters::nvs::NvsPolicyStore;
use alarmtag::alarm::AlarmCause;
use alarmtag::app::events::AppEvent;
use alarmtag::app::link::{Characteristic, LinkEvent};
use alarmtag::app::ports::{LinkIndicator, PolicyStore};
use alarmtag::app::service::AppService;
use alarmtag::config::TagConfig;
use alarmtag::error::PolicyError;
use alarmtag::fsm::StateId;
use alarmtag::policy::PolicyFlags;

use super::mock_ports::{AlertCall, LinkCall, MemStore, Rig};

fn boot(rig: &mut Rig) -> AppService {
    let mut svc = AppService::boot(&rig.store, &mut rig.sink);
    svc.start(&mut rig.link, &mut rig.alert, &mut rig.sink);
    svc
}

fn send(svc: &mut AppService, rig: &mut Rig, event: LinkEvent) {
    svc.dispatch(
        event,
        &mut rig.store,
        &mut rig.link,
        &mut rig.alert,
        &mut rig.sink,
    );
}

fn write(characteristic: Characteristic, bytes: &[u8]) -> LinkEvent {
    LinkEvent::written(characteristic, bytes).unwrap()
}

const PEER: [u8; 6] = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn empty_store_boots_with_defaults_and_advertises() {
    let mut rig = Rig::default();
    let svc = boot(&mut rig);

    assert_eq!(svc.state(), StateId::Disconnected);
    assert_eq!(svc.flags().bits(), 0b01);
    assert!(rig.sink.contains(&AppEvent::Booted {
        flags: PolicyFlags::from_bits(0b01),
        locked: false,
    }));
    assert_eq!(
        rig.link.policy_value(),
        Some("alarm-on-disconnect:1;device-lock:0;")
    );
    assert!(rig.link.advertising());
    assert_eq!(
        rig.alert.calls,
        vec![
            AlertCall::Disarm,
            AlertCall::Indicator(LinkIndicator::Advertising),
            AlertCall::Boot(false),
        ]
    );
}

#[test]
fn stored_lock_and_secret_boot_locked() {
    let mut rig = Rig::with_store(MemStore::with_flags(0b11).with_secret(b"1234"));
    let svc = boot(&mut rig);
    assert!(svc.has_stored_secret());
    assert!(rig.sink.contains(&AppEvent::Booted {
        flags: PolicyFlags::from_bits(0b11),
        locked: true,
    }));
}

#[test]
fn empty_stored_secret_counts_as_absent() {
    let mut rig = Rig::with_store(MemStore::with_flags(0b11).with_secret(b""));
    let mut svc = boot(&mut rig);
    assert!(!svc.has_stored_secret());
    send(&mut svc, &mut rig, LinkEvent::Connected { peer: PEER });
    assert_eq!(svc.state(), StateId::ConnectedAuthorized);
}

// ── Connect / authorize ───────────────────────────────────────

#[test]
fn connect_stops_advertising_and_reports_peer() {
    let mut rig = Rig::default();
    let mut svc = boot(&mut rig);
    send(&mut svc, &mut rig, LinkEvent::Connected { peer: PEER });

    assert!(!rig.link.advertising());
    assert_eq!(
        rig.alert.calls.last(),
        Some(&AlertCall::Indicator(LinkIndicator::Connected))
    );
    assert!(rig.sink.contains(&AppEvent::Connected {
        peer: PEER,
        authorized: true,
    }));
}

#[test]
fn locked_session_needs_the_stored_pin() {
    let mut rig = Rig::with_store(MemStore::with_flags(0b11).with_secret(b"1234"));
    let mut svc = boot(&mut rig);
    send(&mut svc, &mut rig, LinkEvent::Connected { peer: PEER });
    assert_eq!(svc.state(), StateId::ConnectedUnauthorized);

    send(&mut svc, &mut rig, write(Characteristic::MakeAlert, b"1"));
    assert!(!svc.is_armed());
    assert!(rig.sink.contains(&AppEvent::Rejected {
        characteristic: Characteristic::MakeAlert,
        error: PolicyError::Unauthorized,
    }));

    send(&mut svc, &mut rig, write(Characteristic::PinAuth, b"wrong"));
    assert_eq!(svc.state(), StateId::ConnectedUnauthorized);
    assert_eq!(svc.pending_secret().map(|s| s.as_slice()), Some(&b"wrong"[..]));

    send(&mut svc, &mut rig, write(Characteristic::PinAuth, b"1234"));
    assert_eq!(svc.state(), StateId::ConnectedAuthorized);
    assert!(rig.sink.contains(&AppEvent::Unlocked));

    send(&mut svc, &mut rig, write(Characteristic::MakeAlert, &[1]));
    assert!(svc.is_armed());
    assert!(rig.alert.armed());
}

#[test]
fn authorization_ends_with_the_session() {
    let mut rig = Rig::with_store(MemStore::with_flags(0b10).with_secret(b"1234"));
    let mut svc = boot(&mut rig);
    send(&mut svc, &mut rig, LinkEvent::Connected { peer: PEER });
    send(&mut svc, &mut rig, write(Characteristic::PinAuth, b"1234"));
    assert!(svc.session().authorized);

    send(&mut svc, &mut rig, LinkEvent::Disconnected);
    send(&mut svc, &mut rig, LinkEvent::Connected { peer: PEER });
    assert_eq!(svc.state(), StateId::ConnectedUnauthorized);
}

// ── Alarm ─────────────────────────────────────────────────────

#[test]
fn make_alert_toggles_the_buzzer() {
    let mut rig = Rig::default();
    let mut svc = boot(&mut rig);
    send(&mut svc, &mut rig, LinkEvent::Connected { peer: PEER });

    send(&mut svc, &mut rig, write(Characteristic::MakeAlert, b"1"));
    assert!(rig.alert.armed());
    assert!(rig
        .sink
        .contains(&AppEvent::AlarmStarted(AlarmCause::Controller)));

    send(&mut svc, &mut rig, write(Characteristic::MakeAlert, b"1"));
    assert!(!rig.alert.armed());
    assert!(rig.sink.contains(&AppEvent::AlarmStopped));
}

#[test]
fn disconnect_arms_and_never_double_arms() {
    let mut rig = Rig::default();
    let mut svc = boot(&mut rig);
    send(&mut svc, &mut rig, LinkEvent::Connected { peer: PEER });
    send(&mut svc, &mut rig, write(Characteristic::MakeAlert, b"1"));
    assert_eq!(rig.alert.arm_count(), 1);

    send(&mut svc, &mut rig, LinkEvent::Disconnected);
    assert!(svc.is_armed());
    assert_eq!(rig.alert.arm_count(), 1);
    assert!(rig.link.advertising());
    assert_eq!(
        rig.alert.calls.last(),
        Some(&AlertCall::Indicator(LinkIndicator::Advertising))
    );
}

#[test]
fn stray_disconnect_only_readvertises() {
    let mut rig = Rig::default();
    let mut svc = boot(&mut rig);
    let before = rig.sink.events.len();
    send(&mut svc, &mut rig, LinkEvent::Disconnected);
    assert_eq!(rig.sink.events.len(), before);
    assert!(!svc.is_armed());
    assert_eq!(rig.link.calls.last(), Some(&LinkCall::StartAdvertising));
}

// ── End to end ────────────────────────────────────────────────

#[test]
fn lock_with_pin_then_disconnect_arms() {
    let mut rig = Rig::default();
    let mut svc = boot(&mut rig);
    send(&mut svc, &mut rig, LinkEvent::Connected { peer: PEER });

    send(&mut svc, &mut rig, write(Characteristic::AlertPolicyConfig, b"device-lock:1"));
    assert_eq!(svc.flags().bits(), 0b01);
    assert_eq!(rig.link.notifications(), 0);

    send(&mut svc, &mut rig, write(Characteristic::PinAuth, b"9999"));
    send(&mut svc, &mut rig, write(Characteristic::AlertPolicyConfig, b"device-lock:1"));
    assert_eq!(rig.store.flags(), Some(0b11));
    assert_eq!(rig.store.secret(), Some(&b"9999"[..]));
    assert_eq!(
        rig.link.policy_value(),
        Some("alarm-on-disconnect:1;device-lock:1;")
    );
    assert_eq!(rig.link.notifications(), 1);

    send(&mut svc, &mut rig, LinkEvent::Disconnected);
    assert!(svc.is_armed());
    assert!(rig
        .sink
        .contains(&AppEvent::AlarmStarted(AlarmCause::Disconnect)));

    // After a reboot the same store locks new sessions.
    let mut rebooted = AppService::boot(&rig.store, &mut rig.sink);
    rebooted.handle(LinkEvent::Connected { peer: PEER });
    assert_eq!(rebooted.state(), StateId::ConnectedUnauthorized);
}

#[test]
fn whole_stack_runs_on_simulation_backends() {
    let config = TagConfig::default();
    let mut store = NvsPolicyStore::new(config.store_namespace).unwrap();
    let mut link = BleLink::new(&config);
    link.start().unwrap();
    let mut alert = super::mock_ports::RecordingAlert::new();
    let mut sink = LogEventSink::new();

    let mut svc = AppService::boot(&store, &mut sink);
    svc.start(&mut link, &mut alert, &mut sink);
    assert_eq!(
        link.value(Characteristic::AlertPolicyConfig),
        b"alarm-on-disconnect:1;device-lock:0;"
    );

    for event in [
        LinkEvent::Connected { peer: PEER },
        write(Characteristic::PinAuth, b"4321"),
        write(Characteristic::AlertPolicyConfig, b"alarm-on-disconnect:0;device-lock:1;"),
    ] {
        svc.dispatch(event, &mut store, &mut link, &mut alert, &mut sink);
    }

    assert_eq!(store.get_u64("flags").unwrap(), Some(0b10));
    assert!(store.contains("device-pin"));
    let sent = link.sim_notified();
    assert_eq!(sent.len(), 1);
    assert_eq!(&sent[0].1[..], b"alarm-on-disconnect:0;device-lock:1;");
}
