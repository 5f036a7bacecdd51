//! Hardware timers using ESP-IDF's esp_timer API.
//!
//! Two periodic timers drive the toggling outputs: the buzzer while the
//! alarm is armed and the blue LED while advertising.  Each callback
//! advances its [`PeriodicToggle`](super::toggle::PeriodicToggle) and
//! writes the pin only while that toggle is enabled.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR); they
//! only touch atomics and GPIO registers.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use super::hw_init::HwInitError;
#[cfg(target_os = "espidf")]
use super::hw_init::gpio_write;
#[cfg(target_os = "espidf")]
use super::toggle::{ADVERTISING_BLINK, ALARM_TOGGLE};
use crate::config::TagConfig;
#[cfg(target_os = "espidf")]
use crate::pins;

#[cfg(target_os = "espidf")]
static mut ALARM_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut BLINK_TIMER: esp_timer_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe extern "C" fn alarm_tick_cb(_arg: *mut core::ffi::c_void) {
    if let Some(active) = ALARM_TOGGLE.tick() {
        gpio_write(pins::BUZZER_GPIO, active);
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn blink_tick_cb(_arg: *mut core::ffi::c_void) {
    // Active LOW.
    if let Some(active) = ADVERTISING_BLINK.tick() {
        gpio_write(pins::LED_B_GPIO, !active);
    }
}

#[cfg(target_os = "espidf")]
unsafe fn start_periodic(
    callback: unsafe extern "C" fn(*mut core::ffi::c_void),
    name: &'static [u8],
    handle: *mut esp_timer_handle_t,
    period_us: u64,
) -> Result<(), HwInitError> {
    let args = esp_timer_create_args_t {
        callback: Some(callback),
        arg: core::ptr::null_mut(),
        dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
        name: name.as_ptr().cast(),
        skip_unhandled_events: true,
    };
    let ret = unsafe { esp_timer_create(&args, handle) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::TimerFailed(ret));
    }
    let ret = unsafe { esp_timer_start_periodic(*handle, period_us) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::TimerFailed(ret));
    }
    Ok(())
}

/// Start the alarm and advertising-blink timers.  Both run for the life
/// of the firmware; the toggles decide whether a tick does anything.
#[cfg(target_os = "espidf")]
pub fn start_timers(config: &TagConfig) -> Result<(), HwInitError> {
    // SAFETY: the handles are written here once at boot from the single
    // main-task context before any timer callbacks fire.
    unsafe {
        start_periodic(
            alarm_tick_cb,
            b"alarm\0",
            &raw mut ALARM_TIMER,
            config.alarm_toggle_period_us,
        )?;
        start_periodic(
            blink_tick_cb,
            b"adv_blink\0",
            &raw mut BLINK_TIMER,
            config.advertising_blink_period_us,
        )?;
    }
    info!(
        "hw_timer: alarm@{}ms + blink@{}ms started",
        config.alarm_toggle_period_us / 1_000,
        config.advertising_blink_period_us / 1_000
    );
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn start_timers(config: &TagConfig) -> Result<(), HwInitError> {
    log::info!(
        "hw_timer(sim): timers not started (alarm {}us, blink {}us)",
        config.alarm_toggle_period_us,
        config.advertising_blink_period_us
    );
    Ok(())
}
