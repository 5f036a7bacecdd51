//! Alert-Policy-Config writes end to end: gating, persistence order,
//! notification and storage failures.

use alarmtag::app::events::AppEvent;
use alarmtag::app::link::{Characteristic, LinkEvent};
use alarmtag::app::service::AppService;
use alarmtag::error::PolicyError;
use alarmtag::policy::PolicyFlags;

use super::mock_ports::{MemStore, Rig};

fn connected(rig: &mut Rig) -> AppService {
    let mut svc = AppService::boot(&rig.store, &mut rig.sink);
    svc.start(&mut rig.link, &mut rig.alert, &mut rig.sink);
    send(&mut svc, rig, LinkEvent::Connected { peer: [0; 6] });
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

fn configure(svc: &mut AppService, rig: &mut Rig, text: &[u8]) {
    send(
        svc,
        rig,
        LinkEvent::written(Characteristic::AlertPolicyConfig, text).unwrap(),
    );
}

fn pin(svc: &mut AppService, rig: &mut Rig, secret: &[u8]) {
    send(
        svc,
        rig,
        LinkEvent::written(Characteristic::PinAuth, secret).unwrap(),
    );
}

#[test]
fn unauthorized_write_changes_nothing() {
    let mut rig = Rig::with_store(MemStore::with_flags(0b11).with_secret(b"1234"));
    let mut svc = connected(&mut rig);

    configure(&mut svc, &mut rig, b"alarm-on-disconnect:0;device-lock:0;");

    assert_eq!(svc.flags().bits(), 0b11);
    assert!(rig.store.writes.is_empty());
    assert_eq!(rig.link.notifications(), 0);
    assert!(rig.sink.contains(&AppEvent::Rejected {
        characteristic: Characteristic::AlertPolicyConfig,
        error: PolicyError::Unauthorized,
    }));
}

#[test]
fn accepted_write_persists_updates_and_notifies() {
    let mut rig = Rig::default();
    let mut svc = connected(&mut rig);

    configure(&mut svc, &mut rig, b"alarm-on-disconnect:0");

    assert_eq!(rig.store.flags(), Some(0b00));
    assert_eq!(
        rig.link.policy_value(),
        Some("alarm-on-disconnect:0;device-lock:0;")
    );
    assert_eq!(rig.link.notifications(), 1);
    assert!(rig.sink.contains(&AppEvent::PolicyChanged {
        previous: PolicyFlags::from_bits(0b01),
        current: PolicyFlags::from_bits(0b00),
    }));
}

#[test]
fn write_that_changes_nothing_is_acknowledged_but_not_persisted() {
    let mut rig = Rig::default();
    let mut svc = connected(&mut rig);

    configure(&mut svc, &mut rig, b"alarm-on-disconnect:1;");
    configure(&mut svc, &mut rig, b"hello");

    assert!(rig.store.writes.is_empty());
    assert_eq!(rig.link.notifications(), 2);
    assert_eq!(
        rig.link.policy_value(),
        Some("alarm-on-disconnect:1;device-lock:0;")
    );
}

#[test]
fn unknown_bits_survive_a_write() {
    let mut rig = Rig::with_store(MemStore::with_flags(0x100 | 0b01));
    let mut svc = connected(&mut rig);

    configure(&mut svc, &mut rig, b"alarm-on-disconnect:0");
    assert_eq!(rig.store.flags(), Some(0x100));
}

#[test]
fn lock_enable_stores_secret_before_flags() {
    let mut rig = Rig::default();
    let mut svc = connected(&mut rig);

    pin(&mut svc, &mut rig, b"1234");
    configure(&mut svc, &mut rig, b"device-lock:1;");

    assert_eq!(rig.store.writes, vec!["device-pin", "flags"]);
    assert_eq!(rig.store.secret(), Some(&b"1234"[..]));
    assert_eq!(rig.store.flags(), Some(0b11));
    assert!(rig.sink.contains(&AppEvent::SecretCommitted));
    assert!(
        rig.link
            .policy_value()
            .is_some_and(|v| v.contains("device-lock:1;"))
    );
}

#[test]
fn lock_enable_without_pin_is_rejected() {
    let mut rig = Rig::default();
    let mut svc = connected(&mut rig);

    configure(&mut svc, &mut rig, b"alarm-on-disconnect:0;device-lock:1;");

    // The whole write is dropped, including the alarm-on-disconnect part.
    assert_eq!(svc.flags().bits(), 0b01);
    assert!(rig.store.writes.is_empty());
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::Rejected {
            error: PolicyError::InvalidTransition(_),
            ..
        }
    )));
}

#[test]
fn lock_disable_removes_secret_after_flags() {
    let mut rig = Rig::with_store(MemStore::with_flags(0b11).with_secret(b"1234"));
    let mut svc = connected(&mut rig);
    pin(&mut svc, &mut rig, b"1234");

    configure(&mut svc, &mut rig, b"device-lock:0");

    assert_eq!(rig.store.writes, vec!["flags", "device-pin"]);
    assert_eq!(rig.store.secret(), None);
    assert_eq!(rig.store.flags(), Some(0b01));
    assert!(!svc.has_stored_secret());
    assert!(rig.sink.contains(&AppEvent::SecretRemoved));
}

#[test]
fn failed_secret_write_keeps_lock_out_of_the_store() {
    let mut rig = Rig::default();
    rig.store.failing_key = Some("device-pin");
    let mut svc = connected(&mut rig);

    pin(&mut svc, &mut rig, b"1234");
    configure(&mut svc, &mut rig, b"device-lock:1");

    assert_eq!(rig.store.flags(), None);
    assert_eq!(rig.store.secret(), None);
    assert!(rig.store.writes.is_empty());
}

#[test]
fn newest_long_pin_is_the_one_committed() {
    let mut rig = Rig::default();
    let mut svc = connected(&mut rig);

    pin(&mut svc, &mut rig, b"1234");
    pin(&mut svc, &mut rig, &[b'7'; 40]);
    configure(&mut svc, &mut rig, b"device-lock:1");

    assert_eq!(svc.flags().bits(), 0b11);
    assert_eq!(rig.store.secret(), Some(&[b'7'; 40][..]));
}

#[test]
fn read_reflects_flags_without_side_effects() {
    let mut rig = Rig::with_store(MemStore::with_flags(0b10));
    let svc = connected(&mut rig);
    let calls = rig.link.calls.len();

    assert_eq!(svc.policy_text().as_str(), "alarm-on-disconnect:0;device-lock:1;");
    assert_eq!(rig.link.calls.len(), calls);
}
