//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the ESP-IDF
//! logger (UART in production) with a `topic: message` prefix per line.

use core::fmt::Write;

use log::{info, warn};

use crate::alarm::AlarmCause;
use crate::app::events::AppEvent;
use crate::app::link::PeerAddress;
use crate::app::ports::EventSink;
use crate::error::PolicyError;

/// `AA:BB:CC:DD:EE:FF`, most significant byte first.
pub fn format_peer_address(peer: &PeerAddress) -> heapless::String<17> {
    let mut out = heapless::String::new();
    for (i, byte) in peer.iter().enumerate() {
        if i > 0 {
            let _ = out.push(':');
        }
        let _ = write!(out, "{:02X}", byte);
    }
    out
}

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Booted { flags, locked } => {
                info!("config: flag 0x{:x}", flags.bits());
                info!("config: {}", flags.to_text());
                if *locked {
                    info!("auth: device is locked");
                }
            }
            AppEvent::Connected { peer, .. } => {
                info!("client: connected ({})", format_peer_address(peer));
            }
            AppEvent::Disconnected => info!("client: disconnected"),
            AppEvent::Unlocked => info!("auth: unlocked"),
            AppEvent::AlarmStarted(AlarmCause::Controller) => info!("client: start alarm"),
            AppEvent::AlarmStarted(AlarmCause::Disconnect) => {
                info!("policy: start alarm (alarm-on-disconnect)");
            }
            AppEvent::AlarmStopped => info!("client: stop alarm"),
            AppEvent::PolicyChanged { previous, current } => {
                if previous.alarm_on_disconnect != current.alarm_on_disconnect {
                    if current.alarm_on_disconnect {
                        info!("config: alarm-on-disconnect enabled");
                    } else {
                        info!("config: auto-alarm disabled");
                    }
                }
                if previous.device_lock != current.device_lock {
                    if current.device_lock {
                        info!("config: device-lock enabled");
                    } else {
                        info!("config: device-lock disabled");
                    }
                }
                info!("config: new flag 0x{:x}", current.bits());
            }
            AppEvent::SecretCommitted => info!("config: pin set"),
            AppEvent::SecretRemoved => info!("config: pin cleared"),
            AppEvent::Rejected {
                characteristic,
                error,
            } => match error {
                PolicyError::Unauthorized => {
                    warn!("auth: required pin ({} write dropped)", characteristic.name());
                }
                PolicyError::AuthFailure => warn!("auth: wrong pin"),
                PolicyError::InvalidTransition(why) => warn!("config: {}", why),
            },
        }
    }
}
