//! Piezo buzzer driver (active HIGH).
//!
//! The alarm tone itself is produced by the alarm timer toggling the pin;
//! this driver forces the silent level when the alarm stops.

use embedded_hal::digital::OutputPin;

pub struct Buzzer<P: OutputPin> {
    pin: P,
}

impl<P: OutputPin> Buzzer<P> {
    pub fn new(pin: P) -> Self {
        let mut buzzer = Self { pin };
        buzzer.silence();
        buzzer
    }

    pub fn silence(&mut self) {
        if self.pin.set_low().is_err() {
            log::warn!("buzzer: pin write failed");
        }
    }
}
