//! Hardware adapter: bridges the buzzer and status LED to [`AlertActuator`].
//!
//! Periodic behaviour (alarm tone, advertising blink) is switched on and
//! off through the shared [`PeriodicToggle`]s that the hardware timers
//! read.  Steady levels go through the drivers.  On non-espidf targets the
//! drivers sit on simulated pins.

use embedded_hal::digital::OutputPin;
use log::debug;

use crate::app::ports::{AlertActuator, LinkIndicator};
use crate::drivers::buzzer::Buzzer;
use crate::drivers::status_led::StatusLed;
use crate::drivers::toggle::PeriodicToggle;

/// Concrete adapter that combines the tag's outputs behind [`AlertActuator`].
pub struct AlertHardware<P: OutputPin> {
    buzzer: Buzzer<P>,
    led: StatusLed<P>,
    alarm: &'static PeriodicToggle,
    blink: &'static PeriodicToggle,
}

impl<P: OutputPin> AlertHardware<P> {
    pub fn new(
        buzzer: Buzzer<P>,
        led: StatusLed<P>,
        alarm: &'static PeriodicToggle,
        blink: &'static PeriodicToggle,
    ) -> Self {
        Self {
            buzzer,
            led,
            alarm,
            blink,
        }
    }

    pub fn led(&self) -> &StatusLed<P> {
        &self.led
    }
}

impl<P: OutputPin> AlertActuator for AlertHardware<P> {
    fn arm_alarm(&mut self) {
        self.alarm.set_enabled(true);
        debug!("hw: alarm toggle enabled");
    }

    fn disarm_alarm(&mut self) {
        self.alarm.set_enabled(false);
        self.buzzer.silence();
        debug!("hw: alarm toggle disabled");
    }

    fn set_link_indicator(&mut self, indicator: LinkIndicator) {
        match indicator {
            LinkIndicator::Advertising => self.blink.set_enabled(true),
            LinkIndicator::Connected => {
                self.blink.set_enabled(false);
                self.led.set_blue(false);
            }
        }
    }

    fn set_boot_indicator(&mut self, on: bool) {
        self.led.set_red(on);
    }
}
