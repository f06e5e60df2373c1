//! The sweep task: converts control parameters into timed duty changes.
//!
//! Lifecycle: `Idle → Running → Stopping → Idle`. The monitor guarantees at
//! most one instance is Running. While Running, each outer iteration reads
//! a fresh [`ControlState`] snapshot (never the variable store) and either
//! holds a fixed angle or performs one up/down sweep pass. Cancellation is
//! cooperative: the flag is checked before every step, never pre-empted
//! mid-step, so worst-case stop latency is one step delay.
//!
//! Every exit path — normal cancellation or actuation error — funnels
//! through a single terminal `stop()`, so the servo is never left
//! energized at a stale position.

use crate::actuator::SharedActuator;
use crate::duty::duty_cycle_for_angle;
use crate::error::ActuatorError;
use crate::state::{ControlParams, ControlState, DriveMode};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error};

/// Result of one bounded drive segment (fixed hold or sweep pass).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// Segment completed; re-snapshot and continue.
    Continue,
    /// Cancellation observed at a step boundary; exit the loop.
    Cancelled,
}

/// Per-step delay derived from the speed setting: `(100 − speed) ms`,
/// clamped to zero for speeds above 100.
fn step_delay(speed_percent: u8) -> Duration {
    Duration::from_millis(100u64.saturating_sub(speed_percent as u64))
}

/// A single cancellable sweep instance.
pub struct SweepLoop {
    control: Arc<ControlState>,
    actuator: SharedActuator,
    /// Hold interval between fixed-angle re-applications.
    debounce: Duration,
    /// Duty increment per step [tenths of a percent].
    step_tenths: u32,
}

impl SweepLoop {
    pub fn new(
        control: Arc<ControlState>,
        actuator: SharedActuator,
        debounce: Duration,
        step_tenths: u32,
    ) -> Self {
        Self {
            control,
            actuator,
            debounce,
            // A zero step would never advance the pass.
            step_tenths: step_tenths.max(1),
        }
    }

    /// Run until cancellation or an actuation error, then de-energize.
    ///
    /// Intended to be spawned as a task; the monitor owns the join handle.
    pub async fn run(self) {
        debug!("sweep task running");

        if let Err(e) = self.drive().await {
            error!(error = %e, "sweep aborted by actuation error");
        }

        // Terminal stop on every exit path.
        if let Err(e) = self.actuator.lock().stop() {
            error!(error = %e, "failed to de-energize actuator on sweep exit");
        }
        debug!("sweep task idle");
    }

    async fn drive(&self) -> Result<(), ActuatorError> {
        loop {
            if self.control.cancel_requested() {
                return Ok(());
            }

            // Parameter changes take effect here, at the next pass boundary.
            let params = self.control.snapshot();
            let outcome = match (params.mode, params.fixed_angle) {
                (DriveMode::Fixed, Some(angle)) => self.hold_fixed(angle).await?,
                _ => self.sweep_pass(&params).await?,
            };

            if outcome == Outcome::Cancelled {
                return Ok(());
            }
        }
    }

    /// Hold the commanded angle for one debounce interval.
    async fn hold_fixed(&self, angle_deg: i32) -> Result<Outcome, ActuatorError> {
        if self.control.cancel_requested() {
            return Ok(Outcome::Cancelled);
        }
        self.apply(duty_cycle_for_angle(angle_deg))?;
        sleep(self.debounce).await;
        Ok(Outcome::Continue)
    }

    /// One full up/down pass between the configured bounds.
    ///
    /// Steps in multiples of `step_tenths` using an integer step index so
    /// repeated float addition cannot drift; when the step size divides the
    /// duty span both endpoints are hit exactly, otherwise the upper
    /// turnaround is the last full step below the bound.
    async fn sweep_pass(&self, params: &ControlParams) -> Result<Outcome, ActuatorError> {
        let min_duty = duty_cycle_for_angle(params.min_angle);
        let max_duty = duty_cycle_for_angle(params.max_angle);
        let delay = step_delay(params.speed_percent);
        let stride = i64::from(self.step_tenths);
        let steps = ((max_duty - min_duty) * 10.0).round() as i64 / stride;

        for i in 0..=steps {
            if self.control.cancel_requested() {
                return Ok(Outcome::Cancelled);
            }
            self.apply(min_duty + (i * stride) as f64 * 0.1)?;
            sleep(delay).await;
        }

        for i in (0..=steps).rev() {
            if self.control.cancel_requested() {
                return Ok(Outcome::Cancelled);
            }
            self.apply(min_duty + (i * stride) as f64 * 0.1)?;
            sleep(delay).await;
        }

        Ok(Outcome::Continue)
    }

    fn apply(&self, duty_pct: f64) -> Result<(), ActuatorError> {
        self.actuator.lock().set_duty_cycle(duty_pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::{self, PwmActuator, SimPwm};
    use std::sync::atomic::{AtomicU64, Ordering};

    fn sweep_params(min: i32, max: i32, speed: u8) -> ControlParams {
        ControlParams {
            running: true,
            mode: DriveMode::Sweep,
            min_angle: min,
            max_angle: max,
            speed_percent: speed,
            fixed_angle: None,
        }
    }

    fn make_loop(
        params: ControlParams,
        step_tenths: u32,
    ) -> (SweepLoop, Arc<ControlState>, Arc<parking_lot::Mutex<crate::actuator::SimJournal>>) {
        let control = Arc::new(ControlState::new());
        control.apply(params);
        let pwm = SimPwm::new();
        let journal = pwm.journal();
        let sweep = SweepLoop::new(
            Arc::clone(&control),
            actuator::shared(Box::new(pwm)),
            Duration::from_millis(100),
            step_tenths,
        );
        (sweep, control, journal)
    }

    #[test]
    fn step_delay_inverse_of_speed() {
        assert_eq!(step_delay(50), Duration::from_millis(50));
        assert_eq!(step_delay(0), Duration::from_millis(100));
        assert_eq!(step_delay(100), Duration::ZERO);
        // Clamped, never negative.
        assert_eq!(step_delay(255), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn pass_rises_then_falls_with_exact_endpoints() {
        let (sweep, _control, journal) = make_loop(sweep_params(-45, 45, 50), 1);

        let started = tokio::time::Instant::now();
        let outcome = sweep.sweep_pass(&sweep.control.snapshot()).await.unwrap();
        assert_eq!(outcome, Outcome::Continue);

        let applied = journal.lock().applied.clone();
        let lo = duty_cycle_for_angle(-45);
        let hi = duty_cycle_for_angle(45);
        // 7.5% span = 75 tenths, 76 values up and 76 back down.
        assert_eq!(applied.len(), 152);
        assert!((applied[0] - lo).abs() < 1e-9);
        assert!((applied[75] - hi).abs() < 1e-9);
        assert!((applied[151] - lo).abs() < 1e-9);
        assert!(applied[..76].windows(2).all(|w| w[0] <= w[1]));
        assert!(applied[76..].windows(2).all(|w| w[0] >= w[1]));

        // speed 50 → 50 ms between steps, one sleep per applied value.
        assert_eq!(started.elapsed(), Duration::from_millis(50) * 152);
    }

    #[tokio::test(start_paused = true)]
    async fn coarser_step_shortens_the_pass() {
        let (sweep, _control, journal) = make_loop(sweep_params(-45, 45, 50), 5);

        let outcome = sweep.sweep_pass(&sweep.control.snapshot()).await.unwrap();
        assert_eq!(outcome, Outcome::Continue);

        let applied = journal.lock().applied.clone();
        let lo = duty_cycle_for_angle(-45);
        let hi = duty_cycle_for_angle(45);
        // 75 tenths span at 5 tenths per step: 16 values up and 16 down.
        assert_eq!(applied.len(), 32);
        assert!((applied[0] - lo).abs() < 1e-9);
        assert!((applied[15] - hi).abs() < 1e-9);
        assert!((applied[31] - lo).abs() < 1e-9);
        assert!(applied[..16].windows(2).all(|w| (w[1] - w[0] - 0.5).abs() < 1e-9));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_step_is_coerced_to_minimum() {
        let (sweep, _control, journal) = make_loop(sweep_params(-45, 45, 100), 0);

        let outcome = sweep.sweep_pass(&sweep.control.snapshot()).await.unwrap();
        assert_eq!(outcome, Outcome::Continue);
        // Behaves as step 1: the pass terminates with the full staircase.
        assert_eq!(journal.lock().applied.len(), 152);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_halts_within_one_step_and_stops_once() {
        let (sweep, control, journal) = make_loop(sweep_params(-45, 45, 50), 1);

        let handle = tokio::spawn(sweep.run());

        // Let a handful of steps go out, then cancel.
        tokio::time::sleep(Duration::from_millis(250)).await;
        let applied_before = journal.lock().applied.len();
        assert!(applied_before > 0);
        control.request_cancel();

        handle.await.unwrap();

        let j = journal.lock();
        assert_eq!(j.stop_calls, 1);
        assert_eq!(j.current_duty, 0.0);
        // At most one more step after the cancel request.
        assert!(j.applied.len() <= applied_before + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_mode_holds_commanded_angle() {
        let (sweep, control, journal) = make_loop(
            ControlParams {
                running: true,
                mode: DriveMode::Fixed,
                min_angle: -45,
                max_angle: 45,
                speed_percent: 50,
                fixed_angle: Some(10),
            },
            1,
        );

        let handle = tokio::spawn(sweep.run());
        tokio::time::sleep(Duration::from_millis(350)).await;
        control.request_cancel();
        handle.await.unwrap();

        let j = journal.lock();
        let expected = duty_cycle_for_angle(10);
        assert!(!j.applied.is_empty());
        assert!(j.applied.iter().all(|d| (d - expected).abs() < 1e-9));
        assert_eq!(j.stop_calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_angle_zero_is_driven_not_skipped() {
        let (sweep, control, journal) = make_loop(
            ControlParams {
                running: true,
                mode: DriveMode::Fixed,
                min_angle: -45,
                max_angle: 45,
                speed_percent: 50,
                fixed_angle: Some(0),
            },
            1,
        );

        let handle = tokio::spawn(sweep.run());
        tokio::time::sleep(Duration::from_millis(150)).await;
        control.request_cancel();
        handle.await.unwrap();

        let j = journal.lock();
        assert!(j.applied.iter().all(|d| (d - 7.5).abs() < 1e-9));
    }

    /// Driver that fails after a fixed number of applied duties.
    struct FailAfter {
        remaining: u64,
        stop_calls: Arc<AtomicU64>,
    }

    impl PwmActuator for FailAfter {
        fn name(&self) -> &'static str {
            "fail-after"
        }

        fn set_duty_cycle(&mut self, percent: f64) -> Result<(), ActuatorError> {
            if self.remaining == 0 {
                return Err(ActuatorError::OutputFailed {
                    duty_pct: percent,
                    reason: "injected failure".to_string(),
                });
            }
            self.remaining -= 1;
            Ok(())
        }

        fn stop(&mut self) -> Result<(), ActuatorError> {
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn actuation_error_aborts_and_still_stops() {
        let control = Arc::new(ControlState::new());
        control.apply(sweep_params(-45, 45, 50));
        let stop_calls = Arc::new(AtomicU64::new(0));
        let sweep = SweepLoop::new(
            Arc::clone(&control),
            actuator::shared(Box::new(FailAfter {
                remaining: 3,
                stop_calls: Arc::clone(&stop_calls),
            })),
            Duration::from_millis(100),
            1,
        );

        // Returns to Idle on its own; no cancel needed.
        sweep.run().await;
        assert_eq!(stop_calls.load(Ordering::SeqCst), 1);
    }
}
