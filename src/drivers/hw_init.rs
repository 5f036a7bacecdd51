//! One-shot hardware peripheral initialization.
//!
//! Configures the GPIO outputs and the CPU clock using raw ESP-IDF sys
//! calls. Called once from `main()` before the event loop starts.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    ClockConfigFailed(i32),
    TimerFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::ClockConfigFailed(rc) => write!(f, "CPU clock config failed (rc={})", rc),
            Self::TimerFailed(rc) => write!(f, "esp_timer setup failed (rc={})", rc),
        }
    }
}

/// Output pins and the level each is driven to at boot.  LEDs are active
/// LOW: red on while booting, green and blue off.  Buzzer silent.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const BOOT_LEVELS: [(i32, bool); 4] = [
    (pins::LED_R_GPIO, false),
    (pins::LED_G_GPIO, true),
    (pins::LED_B_GPIO, true),
    (pins::BUZZER_GPIO, false),
];

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before event loop; single-threaded.
    unsafe {
        init_gpio_outputs()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    for &(pin, level) in &BOOT_LEVELS {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
        gpio_write(pin, level);
    }

    info!("hw_init: GPIO outputs configured (LED R/G/B, buzzer)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin.
    // Register writes are atomic, so the timer task may call this too.
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

/// An output pin configured by [`init_peripherals`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioPin(pub i32);

impl ErrorType for GpioPin {
    type Error = Infallible;
}

impl OutputPin for GpioPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.0, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        gpio_write(self.0, true);
        Ok(())
    }
}

// ── CPU clock ─────────────────────────────────────────────────

/// Lock the CPU to `mhz`, both as maximum and minimum frequency.
#[cfg(target_os = "espidf")]
pub fn set_cpu_frequency(mhz: u32) -> Result<(), HwInitError> {
    let cfg = esp_pm_config_t {
        max_freq_mhz: mhz as i32,
        min_freq_mhz: mhz as i32,
        light_sleep_enable: false,
    };
    // SAFETY: esp_pm_configure copies the config; the pointer only needs
    // to be valid for the duration of the call.
    let ret = unsafe { esp_pm_configure((&raw const cfg).cast()) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::ClockConfigFailed(ret));
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn set_cpu_frequency(mhz: u32) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): CPU clock {} MHz requested", mhz);
    Ok(())
}

/// Snapshot of the clock tree, in MHz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockInfo {
    pub cpu_mhz: u32,
    pub xtal_mhz: u32,
    pub apb_mhz: u32,
}

impl core::fmt::Display for ClockInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "cpu {} MHz, xtal {} MHz, apb {} MHz",
            self.cpu_mhz, self.xtal_mhz, self.apb_mhz
        )
    }
}

#[cfg(target_os = "espidf")]
pub fn clock_info() -> ClockInfo {
    // SAFETY: read-only clock getters, no side effects.
    unsafe {
        ClockInfo {
            cpu_mhz: esp_rom_get_cpu_ticks_per_us(),
            xtal_mhz: rtc_clk_xtal_freq_get() as u32,
            apb_mhz: esp_clk_apb_freq() as u32 / 1_000_000,
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn clock_info() -> ClockInfo {
    let cpu_mhz = crate::config::TagConfig::default().cpu_freq_mhz;
    ClockInfo {
        cpu_mhz,
        xtal_mhz: 40,
        apb_mhz: cpu_mhz.min(80),
    }
}
