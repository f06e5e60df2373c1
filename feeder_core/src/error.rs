//! Error types for the control core.
//!
//! Two concerns, two enums: transient variable-store I/O and actuation
//! failures. Store errors are retried on the next monitor tick; actuation
//! errors abort the current sweep and require a fresh start edge.

use thiserror::Error;

/// Error type for variable-store slot operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The slot exists but could not be read/written this time.
    #[error("Slot {slot} unavailable: {reason}")]
    SlotUnavailable {
        /// Slot name.
        slot: &'static str,
        /// Backend-specific failure description.
        reason: String,
    },

    /// A value of the wrong shape was found in a slot.
    #[error("Slot {slot} holds an unexpected value kind")]
    TypeMismatch {
        /// Slot name.
        slot: &'static str,
    },

    /// Backend connection-level failure.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Error type for PWM actuator operations.
#[derive(Debug, Clone, Error)]
pub enum ActuatorError {
    /// Driver initialization failed (fatal at startup).
    #[error("Actuator initialization failed: {0}")]
    InitFailed(String),

    /// Applying a duty cycle to the output failed.
    #[error("Failed to apply duty cycle {duty_pct:.1}%: {reason}")]
    OutputFailed {
        /// Duty cycle that was being applied [%].
        duty_pct: f64,
        /// Driver-specific failure description.
        reason: String,
    },
}
