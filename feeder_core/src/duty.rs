//! Angle → duty-cycle conversion.
//!
//! The affine mapping is a hardware calibration constant for this servo and
//! must be reproduced exactly: `duty = 2.5 + (angle + 60) * (10 / 120)`.
//! Callers are responsible for passing angles within the mechanical range;
//! the conversion itself has no error conditions.

use feeder_common::consts::{
    ANGLE_OFFSET_DEG, ANGLE_SPAN_DEG, DUTY_OFFSET_PCT, DUTY_SPAN_PCT,
};

/// Convert a logical servo angle [degrees] to a PWM duty cycle [%].
///
/// Pure and deterministic. Monotonic non-decreasing in `angle_deg`.
#[inline]
pub fn duty_cycle_for_angle(angle_deg: i32) -> f64 {
    DUTY_OFFSET_PCT
        + (angle_deg + ANGLE_OFFSET_DEG) as f64 * (DUTY_SPAN_PCT / ANGLE_SPAN_DEG as f64)
}
