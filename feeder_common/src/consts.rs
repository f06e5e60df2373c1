//! System-wide constants for the feeder workspace.
//!
//! Single source of truth for the servo calibration mapping and default
//! timing. Imported by all crates — no duplication permitted.

/// Duty cycle [%] commanded at the lower mechanical end stop.
///
/// Part of the hardware calibration mapping
/// `duty = 2.5 + (angle + 60) * (10 / 120)`. Changing any of these four
/// constants changes the physical angle the servo reaches.
pub const DUTY_OFFSET_PCT: f64 = 2.5;

/// Duty cycle span [%] across the full mechanical travel.
pub const DUTY_SPAN_PCT: f64 = 10.0;

/// Offset [degrees] mapping the lower end stop to zero travel.
pub const ANGLE_OFFSET_DEG: i32 = 60;

/// Full mechanical travel [degrees].
pub const ANGLE_SPAN_DEG: i32 = 120;

/// Lower mechanical angle limit [degrees].
pub const MIN_ANGLE_DEG: i32 = -60;

/// Upper mechanical angle limit [degrees].
pub const MAX_ANGLE_DEG: i32 = 60;

/// PWM carrier frequency [Hz] for the servo signal.
pub const PWM_FREQUENCY_HZ: f64 = 50.0;

/// Default monitor polling period [ms].
pub const DEFAULT_POLL_PERIOD_MS: u64 = 100;

/// Default fixed-angle hold debounce interval [ms].
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Default sweep duty step size [tenths of a percent].
pub const DUTY_STEP_TENTHS: u32 = 1;
