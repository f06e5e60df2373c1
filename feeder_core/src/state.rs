//! Shared control state between the monitor and the sweep task.
//!
//! Single-writer (monitor), single-reader-for-control (sweep task)
//! discipline. The parameter record is guarded by a mutex so the sweep
//! task can never observe a torn write (e.g. a new `min_angle` paired
//! with a stale `max_angle`); the cancel flag is a separate atomic so
//! setting it never contends with a reconciliation in progress.

use feeder_common::consts::{MAX_ANGLE_DEG, MIN_ANGLE_DEG};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// What the actuator should be doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveMode {
    /// Continuous back-and-forth motion between `min_angle` and `max_angle`.
    #[default]
    Sweep,
    /// Hold a single commanded angle.
    Fixed,
}

/// The reconciled desired behavior, written by the monitor each tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlParams {
    /// Whether the sweep loop should be active (desired state, mirrors the
    /// store's start slot — not actual task liveness).
    pub running: bool,
    /// Fixed iff a fixed angle is present.
    pub mode: DriveMode,
    /// Sweep lower bound [degrees]. Invariant: `min_angle <= max_angle`,
    /// enforced at the gateway boundary.
    pub min_angle: i32,
    /// Sweep upper bound [degrees].
    pub max_angle: i32,
    /// Speed in [0,100]; inversely controls the per-step delay.
    pub speed_percent: u8,
    /// Present only in fixed mode. An explicit option — a fixed target of
    /// 0° is legitimate and distinct from "unset".
    pub fixed_angle: Option<i32>,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            running: false,
            mode: DriveMode::Sweep,
            min_angle: MIN_ANGLE_DEG,
            max_angle: MAX_ANGLE_DEG,
            speed_percent: 50,
            fixed_angle: None,
        }
    }
}

/// The single shared control record. One instance, process-wide lifetime.
#[derive(Debug, Default)]
pub struct ControlState {
    params: Mutex<ControlParams>,
    cancel: AtomicBool,
}

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone the current parameters under the lock.
    pub fn snapshot(&self) -> ControlParams {
        self.params.lock().clone()
    }

    /// Overwrite the parameters under the lock. The cancel flag is not
    /// touched; it has its own lifecycle tied to start/stop edges.
    pub fn apply(&self, params: ControlParams) {
        *self.params.lock() = params;
    }

    /// Signal the sweep task to exit at its next step boundary.
    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Re-arm for a fresh sweep instance.
    pub fn clear_cancel(&self) {
        self.cancel.store(false, Ordering::SeqCst);
    }

    /// Checked by the sweep task before every step.
    pub fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}
