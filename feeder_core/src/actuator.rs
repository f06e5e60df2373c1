//! PWM actuator trait and drivers.
//!
//! The actuator is the only component permitted to write physical
//! duty-cycle output. `PwmActuator` keeps the backend pluggable:
//! [`SimPwm`] is the default (host-side) driver and records every applied
//! duty for diagnostics and tests; [`HardwarePwm`] drives the Raspberry Pi
//! hardware PWM peripheral and is only compiled with the `hardware`
//! feature.

use crate::error::ActuatorError;
use parking_lot::Mutex;
use std::sync::Arc;

/// Interface for pluggable PWM output drivers.
///
/// # Contract
///
/// - `set_duty_cycle` is idempotent: re-applying the current value is safe.
/// - `stop` sets the output to 0% and is idempotent. It is called on every
///   sweep exit path (normal stop, cancellation, actuation error) and again
///   at process shutdown, so calling it twice in succession must be safe.
pub trait PwmActuator: Send {
    /// Driver identifier (e.g. "sim", "rppal").
    fn name(&self) -> &'static str;

    /// Apply a duty cycle [%] to the output.
    fn set_duty_cycle(&mut self, percent: f64) -> Result<(), ActuatorError>;

    /// De-energize the output (duty cycle 0).
    fn stop(&mut self) -> Result<(), ActuatorError>;
}

// ─── Simulation Driver ──────────────────────────────────────────────

/// Journal of everything a [`SimPwm`] driver was asked to do.
#[derive(Debug, Default)]
pub struct SimJournal {
    /// Every duty value applied via `set_duty_cycle`, in order.
    pub applied: Vec<f64>,
    /// Number of `stop()` calls.
    pub stop_calls: u64,
    /// Current output duty [%] (0 after `stop`).
    pub current_duty: f64,
}

/// Simulation PWM driver.
///
/// Records applied duties instead of touching hardware. The journal is
/// shared so tests (and diagnostics) can observe the output stream while
/// the sweep task owns the driver.
pub struct SimPwm {
    journal: Arc<Mutex<SimJournal>>,
}

impl SimPwm {
    pub fn new() -> Self {
        Self {
            journal: Arc::new(Mutex::new(SimJournal::default())),
        }
    }

    /// Shared handle to the output journal.
    pub fn journal(&self) -> Arc<Mutex<SimJournal>> {
        Arc::clone(&self.journal)
    }
}

impl Default for SimPwm {
    fn default() -> Self {
        Self::new()
    }
}

impl PwmActuator for SimPwm {
    fn name(&self) -> &'static str {
        "sim"
    }

    fn set_duty_cycle(&mut self, percent: f64) -> Result<(), ActuatorError> {
        let mut journal = self.journal.lock();
        journal.applied.push(percent);
        journal.current_duty = percent;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), ActuatorError> {
        let mut journal = self.journal.lock();
        journal.stop_calls += 1;
        journal.current_duty = 0.0;
        Ok(())
    }
}

// ─── Hardware Driver (Raspberry Pi) ─────────────────────────────────

/// Raspberry Pi hardware PWM driver (50 Hz servo signal).
///
/// Don't power the servo from the Pi's GPIO header; current spikes during
/// stalls can reboot the Pi.
#[cfg(feature = "hardware")]
pub struct HardwarePwm {
    pwm: rppal::pwm::Pwm,
}

#[cfg(feature = "hardware")]
impl HardwarePwm {
    /// Open the given PWM channel (0 or 1) at the servo carrier frequency,
    /// initially de-energized.
    ///
    /// # Errors
    ///
    /// Returns `ActuatorError::InitFailed` if the channel number is unknown
    /// or the PWM peripheral cannot be opened. This is fatal at startup —
    /// there is no degraded mode.
    pub fn new(channel: u8) -> Result<Self, ActuatorError> {
        use feeder_common::consts::PWM_FREQUENCY_HZ;
        use rppal::pwm::{Channel, Polarity, Pwm};

        let channel = match channel {
            0 => Channel::Pwm0,
            1 => Channel::Pwm1,
            other => {
                return Err(ActuatorError::InitFailed(format!(
                    "unknown PWM channel {other}"
                )));
            }
        };
        let pwm = Pwm::with_frequency(channel, PWM_FREQUENCY_HZ, 0.0, Polarity::Normal, true)
            .map_err(|e| ActuatorError::InitFailed(e.to_string()))?;
        Ok(Self { pwm })
    }
}

#[cfg(feature = "hardware")]
impl PwmActuator for HardwarePwm {
    fn name(&self) -> &'static str {
        "rppal"
    }

    fn set_duty_cycle(&mut self, percent: f64) -> Result<(), ActuatorError> {
        // rppal expects a 0.0..=1.0 ratio.
        self.pwm
            .set_duty_cycle(percent / 100.0)
            .map_err(|e| ActuatorError::OutputFailed {
                duty_pct: percent,
                reason: e.to_string(),
            })
    }

    fn stop(&mut self) -> Result<(), ActuatorError> {
        self.pwm
            .set_duty_cycle(0.0)
            .map_err(|e| ActuatorError::OutputFailed {
                duty_pct: 0.0,
                reason: e.to_string(),
            })
    }
}

/// Shared, lockable handle to the single physical actuator.
///
/// Successive sweep instances and the shutdown path all write through this
/// handle; the lock is held only for the duration of a single driver call,
/// never across a sleep.
pub type SharedActuator = Arc<Mutex<Box<dyn PwmActuator>>>;

/// Wrap a driver into the shared handle used by the monitor and sweep task.
pub fn shared(driver: Box<dyn PwmActuator>) -> SharedActuator {
    Arc::new(Mutex::new(driver))
}
