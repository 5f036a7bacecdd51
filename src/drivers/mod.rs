//! Output drivers, hardware initialisation, and periodic timers.

pub mod buzzer;
pub mod hw_init;
pub mod hw_timer;
pub mod status_led;
pub mod toggle;
