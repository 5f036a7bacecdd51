//! RGB status LED driver.
//!
//! Three discrete channels of a common-anode RGB LED, each on its own GPIO
//! and lit when driven LOW.
//!
//! | Channel | Meaning                          |
//! |---------|----------------------------------|
//! | red     | firmware booting                 |
//! | green   | unused, held off                 |
//! | blue    | link (blink while advertising)   |
//!
//! Blue blinking is done by the advertising timer; this driver only sets
//! steady levels.

use embedded_hal::digital::OutputPin;

pub struct StatusLed<P: OutputPin> {
    red: P,
    green: P,
    blue: P,
    current: (bool, bool, bool),
}

impl<P: OutputPin> StatusLed<P> {
    /// Takes the three channel pins and turns every channel off.
    pub fn new(red: P, green: P, blue: P) -> Self {
        let mut led = Self {
            red,
            green,
            blue,
            current: (true, true, true),
        };
        led.set(false, false, false);
        led
    }

    pub fn set(&mut self, red: bool, green: bool, blue: bool) {
        drive(&mut self.red, red);
        drive(&mut self.green, green);
        drive(&mut self.blue, blue);
        self.current = (red, green, blue);
    }

    pub fn set_red(&mut self, on: bool) {
        let (_, g, b) = self.current;
        self.set(on, g, b);
    }

    pub fn set_blue(&mut self, on: bool) {
        let (r, g, _) = self.current;
        self.set(r, g, on);
    }

    pub fn off(&mut self) {
        self.set(false, false, false);
    }

    /// (red, green, blue) as last set.  Does not reflect timer blinking.
    pub fn current(&self) -> (bool, bool, bool) {
        self.current
    }
}

fn drive<P: OutputPin>(pin: &mut P, on: bool) {
    let result = if on { pin.set_low() } else { pin.set_high() };
    if result.is_err() {
        log::warn!("status_led: pin write failed");
    }
}
