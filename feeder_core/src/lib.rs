//! # Feeder Control Core
//!
//! Bridges an externally writable variable store and a single PWM servo.
//! A polling [`monitor::Monitor`] reconciles the store into the shared
//! [`state::ControlState`] and owns the lifecycle of at most one
//! [`sweep::SweepLoop`] task, which converts the desired behavior (sweep
//! range/speed or a fixed angle) into timed duty-cycle changes on a
//! pluggable [`actuator::PwmActuator`].
//!
//! ## Synchronization discipline
//!
//! - `ControlState` is the only shared mutable resource between the monitor
//!   and the sweep task: mutex-guarded parameters, atomic cancel flag.
//! - The sweep task never reads the variable store; the monitor is its
//!   single writer-for-control.
//! - Sweep start/stop is edge-triggered and cancellation is cooperative,
//!   checked at every step boundary.

pub mod actuator;
pub mod duty;
pub mod error;
pub mod monitor;
pub mod state;
pub mod store;
pub mod sweep;
