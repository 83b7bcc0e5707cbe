//! GPIO / peripheral pin assignments for the check-in feedback node.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Status LED (discrete RGB, common-cathode unless configured otherwise)
// ---------------------------------------------------------------------------

pub const LED_R_GPIO: i32 = 11;
pub const LED_G_GPIO: i32 = 12;
pub const LED_B_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// Buzzer (active buzzer, driven HIGH to sound)
// ---------------------------------------------------------------------------

pub const BUZZER_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits).  10-bit gives 0 – 1023 duty levels, enough
/// for the 1/1000 steps the LED driver writes.
pub const PWM_RESOLUTION_BITS: u32 = 10;
/// LEDC frequency for the RGB status LED (1 kHz).
pub const LED_PWM_FREQ_HZ: u32 = 1_000;
