//! AlarmTag Firmware: Main Entry Point
//!
//! Hexagonal architecture with a single event-draining main loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BleLink          AlertHardware    NvsPolicyStore  LogEventSink│
//! │  (LinkTransport)  (AlertActuator)  (PolicyStore)   (EventSink) │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Session FSM · Policy · Auth gate · Alarm              │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Bluedroid callbacks ──▶ event queue ──▶ main loop             │
//! │  esp_timer ──▶ PeriodicToggle ──▶ buzzer / blue LED            │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use esp_idf_hal::delay::FreeRtos;
use log::{info, warn};

use alarmtag::adapters::ble::BleLink;
use alarmtag::adapters::hardware::AlertHardware;
use alarmtag::adapters::log_sink::LogEventSink;
use alarmtag::adapters::nvs::NvsPolicyStore;
use alarmtag::app::ports::AlertActuator;
use alarmtag::app::service::AppService;
use alarmtag::config::TagConfig;
use alarmtag::drivers::buzzer::Buzzer;
use alarmtag::drivers::hw_init::{self, GpioPin};
use alarmtag::drivers::hw_timer;
use alarmtag::drivers::status_led::StatusLed;
use alarmtag::drivers::toggle::{ADVERTISING_BLINK, ALARM_TOGGLE};
use alarmtag::error::Error;
use alarmtag::events::drain_events;
use alarmtag::pins;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  AlarmTag v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = TagConfig::default();

    // ── 2. Clock ──────────────────────────────────────────────
    info!("clock: {}", hw_init::clock_info());
    if let Err(e) = hw_init::set_cpu_frequency(config.cpu_freq_mhz) {
        warn!("clock: {}, keeping current frequency", e);
    }
    info!("clock: {}", hw_init::clock_info());

    // ── 3. Outputs: boot indicator on, everything else off ────
    hw_init::init_peripherals().map_err(Error::from)?;
    let led = StatusLed::new(
        GpioPin(pins::LED_R_GPIO),
        GpioPin(pins::LED_G_GPIO),
        GpioPin(pins::LED_B_GPIO),
    );
    let buzzer = Buzzer::new(GpioPin(pins::BUZZER_GPIO));
    let mut hardware = AlertHardware::new(buzzer, led, &ALARM_TOGGLE, &ADVERTISING_BLINK);
    hardware.set_boot_indicator(true);
    hw_timer::start_timers(&config).map_err(Error::from)?;

    // ── 4. Policy store + application core ────────────────────
    let mut store = NvsPolicyStore::new(config.store_namespace).map_err(Error::from)?;
    let mut sink = LogEventSink::new();
    let mut service = AppService::boot(&store, &mut sink);

    // ── 5. BLE link ───────────────────────────────────────────
    let mut link = BleLink::new(&config);
    link.start().map_err(Error::from)?;
    service.start(&mut link, &mut hardware, &mut sink);

    // ── 6. Event loop ─────────────────────────────────────────
    loop {
        drain_events(|event| {
            service.dispatch(event, &mut store, &mut link, &mut hardware, &mut sink);
        });
        FreeRtos::delay_ms(config.event_poll_ms);
    }
}
