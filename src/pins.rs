//! GPIO pin assignments for the AlarmTag board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Status LED (discrete common-anode RGB, active LOW)
// ---------------------------------------------------------------------------

/// Red channel: lit while the firmware is booting.
pub const LED_R_GPIO: i32 = 27;
/// Green channel: unused, held off.
pub const LED_G_GPIO: i32 = 25;
/// Blue channel: blinks while advertising.
pub const LED_B_GPIO: i32 = 33;

// ---------------------------------------------------------------------------
// Buzzer (active HIGH)
// ---------------------------------------------------------------------------

pub const BUZZER_GPIO: i32 = 32;
