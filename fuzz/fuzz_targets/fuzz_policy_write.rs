//! Fuzz target: controller writes through `AppService::handle`
//!
//! Splits the input into a sequence of link events (connect, disconnect,
//! writes to any characteristic with arbitrary payloads) and feeds them to
//! the service.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - Turning device-lock on always stores a non-empty secret before the
//!   flags word
//! - An unauthorized session never changes the flags
//!
//! cargo fuzz run fuzz_policy_write

#![no_main]

use alarmtag::app::effects::Effect;
use alarmtag::app::link::{Characteristic, LinkEvent};
use alarmtag::app::service::AppService;
use alarmtag::auth::Secret;
use alarmtag::policy::PolicyFlags;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // First byte seeds the flags, second the stored secret's presence.
    let flags = PolicyFlags::from_bits(u64::from(data[0]));
    let stored = (data[1] & 1 == 1).then(|| Secret::from_slice(b"1234").unwrap());
    let mut svc = AppService::new(flags, stored);

    // Remaining bytes: [opcode, len, payload..]*
    let mut rest = &data[2..];
    while let [op, len, tail @ ..] = rest {
        let len = (*len as usize).min(tail.len());
        let (payload, next) = tail.split_at(len);
        rest = next;

        let event = match op % 5 {
            0 => LinkEvent::Connected { peer: [0; 6] },
            1 => LinkEvent::Disconnected,
            n => match LinkEvent::written(Characteristic::ALL[(n - 2) as usize], payload) {
                Some(event) => event,
                None => continue,
            },
        };

        let before = svc.flags();
        let authorized = svc.session().authorized;
        let effects = svc.handle(event);

        if !authorized {
            assert_eq!(svc.flags(), before, "unauthorized session changed flags");
        }
        for (i, effect) in effects.iter().enumerate() {
            if let Effect::PersistFlags(bits) = effect {
                if PolicyFlags::from_bits(*bits).device_lock && !before.device_lock {
                    assert!(
                        effects[..i]
                            .iter()
                            .any(|e| matches!(e, Effect::StoreSecret(s) if !s.is_empty())),
                        "lock persisted without a secret"
                    );
                }
            }
        }
    }
});
