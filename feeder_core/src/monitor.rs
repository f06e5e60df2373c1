//! Polling monitor: reconciles the variable store into the control state
//! and owns the sweep task lifecycle.
//!
//! Each tick reads all control slots, overwrites [`ControlState`]
//! unconditionally (the fields are independent, so a cheap full overwrite
//! is always consistent), and performs edge detection on the start flag:
//! a rising edge spawns exactly one sweep task, a falling edge requests
//! cancellation without blocking the tick. Level-triggered behavior would
//! spawn a new task on every tick while the flag stays true; edges prevent
//! that.
//!
//! Slot reads are not atomic as a group — a client update may land split
//! across two ticks. That window is accepted and bounded by the poll
//! period. A failed slot read skips reconciliation entirely for that tick
//! (no partial updates), logged and retried on the next tick.

use crate::actuator::SharedActuator;
use crate::error::StoreError;
use crate::state::{ControlParams, ControlState, DriveMode};
use crate::store::{Slot, VariableStore};
use crate::sweep::SweepLoop;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

/// Timing knobs for the monitor and the sweep tasks it spawns.
#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    /// Store polling period.
    pub poll_period: Duration,
    /// Fixed-angle hold debounce interval.
    pub debounce: Duration,
    /// Sweep duty increment [tenths of a percent].
    pub duty_step_tenths: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        use feeder_common::consts::{DEFAULT_DEBOUNCE_MS, DEFAULT_POLL_PERIOD_MS, DUTY_STEP_TENTHS};
        Self {
            poll_period: Duration::from_millis(DEFAULT_POLL_PERIOD_MS),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            duty_step_tenths: DUTY_STEP_TENTHS,
        }
    }
}

/// One tick's consistent view of the store, assembled slot by slot.
#[derive(Debug, Clone, Copy)]
struct StoreSnapshot {
    start: bool,
    speed_percent: u8,
    min_angle: i32,
    max_angle: i32,
    fixed_angle: Option<i32>,
}

/// Start-flag edge observed on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    None,
    Rising,
    Falling,
}

/// Narrow a stored angle to the mechanical range.
fn clamp_angle(raw: i64) -> i32 {
    use feeder_common::consts::{MAX_ANGLE_DEG, MIN_ANGLE_DEG};
    raw.clamp(i64::from(MIN_ANGLE_DEG), i64::from(MAX_ANGLE_DEG)) as i32
}

/// The polling monitor. Single writer of [`ControlState`], sole owner of
/// the sweep task handle.
pub struct Monitor {
    store: Arc<dyn VariableStore>,
    control: Arc<ControlState>,
    actuator: SharedActuator,
    config: MonitorConfig,
    /// Actual sweep-task liveness as the monitor believes it — distinct
    /// from the desired `ControlParams::running`.
    sweep_alive: bool,
    sweep_handle: Option<JoinHandle<()>>,
    /// Total sweep instances started (diagnostic).
    sweeps_started: u64,
    tick: u64,
}

impl Monitor {
    pub fn new(
        store: Arc<dyn VariableStore>,
        control: Arc<ControlState>,
        actuator: SharedActuator,
        config: MonitorConfig,
    ) -> Self {
        Self {
            store,
            control,
            actuator,
            config,
            sweep_alive: false,
            sweep_handle: None,
            sweeps_started: 0,
            tick: 0,
        }
    }

    /// Poll until the shutdown signal flips, then perform the ordered
    /// teardown: cancel → join the active sweep → de-energize the actuator.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.config.poll_period);
        info!(
            poll_period_ms = self.config.poll_period.as_millis() as u64,
            "monitor started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => self.poll_tick().await,
                res = shutdown.changed() => {
                    if res.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.shutdown().await;
    }

    /// One polling tick: snapshot → reconcile → edge handling.
    async fn poll_tick(&mut self) {
        self.tick += 1;

        let snapshot = match self.read_snapshot() {
            Ok(s) => s,
            Err(e) => {
                warn!(
                    tick = self.tick,
                    error = %e,
                    "store read failed; control state unchanged this tick"
                );
                return;
            }
        };

        match self.reconcile(&snapshot) {
            Edge::Rising => self.start_sweep().await,
            Edge::Falling => {
                // Fire-and-forget: the tick never blocks on the join.
                info!(tick = self.tick, "stop edge: requesting sweep cancellation");
                self.control.request_cancel();
                self.sweep_alive = false;
            }
            Edge::None => {}
        }
    }

    /// Read all control slots. Any failure aborts the whole snapshot so a
    /// partially reconciled state can never be observed.
    ///
    /// Protocol-backed stores can hold values outside the mechanical
    /// envelope; those are clamped here rather than wrapped by a narrowing
    /// cast.
    fn read_snapshot(&self) -> Result<StoreSnapshot, StoreError> {
        Ok(StoreSnapshot {
            start: self.store.read_bool(Slot::Start)?,
            speed_percent: self.store.read_int(Slot::SpeedPercent)?.clamp(0, 100) as u8,
            min_angle: clamp_angle(self.store.read_int(Slot::MinAngle)?),
            max_angle: clamp_angle(self.store.read_int(Slot::MaxAngle)?),
            fixed_angle: self.store.read_opt_int(Slot::FixedAngle)?.map(clamp_angle),
        })
    }

    /// Overwrite the control parameters and classify the start-flag edge
    /// against actual sweep liveness.
    fn reconcile(&self, snapshot: &StoreSnapshot) -> Edge {
        let mode = if snapshot.fixed_angle.is_some() {
            DriveMode::Fixed
        } else {
            DriveMode::Sweep
        };

        self.control.apply(ControlParams {
            running: snapshot.start,
            mode,
            min_angle: snapshot.min_angle,
            max_angle: snapshot.max_angle,
            speed_percent: snapshot.speed_percent,
            fixed_angle: snapshot.fixed_angle,
        });

        match (snapshot.start, self.sweep_alive) {
            (true, false) => Edge::Rising,
            (false, true) => Edge::Falling,
            _ => Edge::None,
        }
    }

    /// Spawn a new sweep instance, provided the previous one has fully
    /// reached Idle. Otherwise the start is deferred to a later tick —
    /// two sweep instances must never run concurrently.
    async fn start_sweep(&mut self) {
        if let Some(handle) = &self.sweep_handle {
            if !handle.is_finished() {
                debug!(tick = self.tick, "start deferred: previous sweep still stopping");
                return;
            }
        }
        if let Some(handle) = self.sweep_handle.take() {
            // Finished — the join is immediate.
            if let Err(e) = handle.await {
                error!(error = %e, "previous sweep task panicked");
            }
        }

        self.control.clear_cancel();
        let sweep = SweepLoop::new(
            Arc::clone(&self.control),
            Arc::clone(&self.actuator),
            self.config.debounce,
            self.config.duty_step_tenths,
        );
        self.sweep_handle = Some(tokio::spawn(sweep.run()));
        self.sweep_alive = true;
        self.sweeps_started += 1;
        info!(tick = self.tick, "start edge: sweep task spawned");
    }

    /// Ordered teardown. Waiting for the sweep to reach Idle before
    /// releasing the actuator prevents a dangling energized output.
    async fn shutdown(mut self) {
        info!(sweeps_started = self.sweeps_started, "monitor shutting down");
        self.control.request_cancel();

        if let Some(handle) = self.sweep_handle.take() {
            if let Err(e) = handle.await {
                error!(error = %e, "sweep task panicked during shutdown");
            }
        }

        if let Err(e) = self.actuator.lock().stop() {
            error!(error = %e, "failed to release actuator at shutdown");
        }
        info!("monitor shutdown complete");
    }
}
