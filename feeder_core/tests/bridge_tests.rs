//! End-to-end bridge tests: store → monitor → sweep task → actuator.
//!
//! Exercises the same path a REST client drives in production, with the
//! gateway replaced by direct slot writes and time paused for
//! deterministic scheduling.

use feeder_core::actuator::{self, SimJournal, SimPwm};
use feeder_core::duty::duty_cycle_for_angle;
use feeder_core::monitor::{Monitor, MonitorConfig};
use feeder_core::state::ControlState;
use feeder_core::store::{MemStore, Slot, SlotValue, VariableStore};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

struct Bridge {
    store: Arc<MemStore>,
    journal: Arc<Mutex<SimJournal>>,
    shutdown: watch::Sender<bool>,
    monitor_task: JoinHandle<()>,
}

fn spawn_bridge() -> Bridge {
    let store = Arc::new(MemStore::new());
    let control = Arc::new(ControlState::new());
    let pwm = SimPwm::new();
    let journal = pwm.journal();

    let monitor = Monitor::new(
        Arc::clone(&store) as Arc<dyn VariableStore>,
        control,
        actuator::shared(Box::new(pwm)),
        MonitorConfig::default(),
    );

    let (shutdown, rx) = watch::channel(false);
    let monitor_task = tokio::spawn(monitor.run(rx));

    Bridge {
        store,
        journal,
        shutdown,
        monitor_task,
    }
}

fn write(store: &MemStore, slot: Slot, value: SlotValue) {
    store.write_slot(slot, value).unwrap();
}

#[tokio::test(start_paused = true)]
async fn sweep_starts_on_rising_edge_and_stops_on_falling_edge() {
    let bridge = spawn_bridge();

    // Nothing happens while the start flag is down.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(bridge.journal.lock().applied.is_empty());

    write(&bridge.store, Slot::SpeedPercent, SlotValue::Int(50));
    write(&bridge.store, Slot::MinAngle, SlotValue::Int(-45));
    write(&bridge.store, Slot::MaxAngle, SlotValue::Int(45));
    write(&bridge.store, Slot::Start, SlotValue::Bool(true));

    tokio::time::sleep(Duration::from_secs(1)).await;
    {
        let j = bridge.journal.lock();
        let lo = duty_cycle_for_angle(-45);
        let hi = duty_cycle_for_angle(45);
        assert!(!j.applied.is_empty());
        assert!(j.applied.iter().all(|d| (lo..=hi).contains(d)));
        // The pass starts at the lower bound and rises.
        assert!((j.applied[0] - lo).abs() < 1e-9);
        assert!(j.applied.windows(2).take(10).all(|w| w[1] >= w[0]));
    }

    write(&bridge.store, Slot::Start, SlotValue::Bool(false));
    tokio::time::sleep(Duration::from_millis(300)).await;

    let settled = {
        let j = bridge.journal.lock();
        assert_eq!(j.stop_calls, 1);
        assert_eq!(j.current_duty, 0.0);
        j.applied.len()
    };

    // No further output once the sweep has reached idle.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(bridge.journal.lock().applied.len(), settled);

    bridge.shutdown.send(true).unwrap();
    bridge.monitor_task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn fixed_angle_holds_until_cleared() {
    let bridge = spawn_bridge();

    write(&bridge.store, Slot::FixedAngle, SlotValue::Int(10));
    write(&bridge.store, Slot::Start, SlotValue::Bool(true));

    tokio::time::sleep(Duration::from_secs(1)).await;
    {
        let j = bridge.journal.lock();
        let expected = duty_cycle_for_angle(10);
        assert!(!j.applied.is_empty());
        assert!(j.applied.iter().all(|d| (d - expected).abs() < 1e-9));
    }

    // Clearing the fixed angle switches the same sweep instance back to
    // sweeping at its next pass boundary.
    write(&bridge.store, Slot::FixedAngle, SlotValue::Unset);
    tokio::time::sleep(Duration::from_secs(1)).await;
    {
        let j = bridge.journal.lock();
        let distinct_duties = j
            .applied
            .iter()
            .map(|d| (d * 10.0).round() as i64)
            .collect::<std::collections::HashSet<_>>();
        assert!(distinct_duties.len() > 1);
    }

    bridge.shutdown.send(true).unwrap();
    bridge.monitor_task.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn restart_cycle_spawns_a_fresh_sweep() {
    let bridge = spawn_bridge();

    write(&bridge.store, Slot::Start, SlotValue::Bool(true));
    tokio::time::sleep(Duration::from_millis(500)).await;

    write(&bridge.store, Slot::Start, SlotValue::Bool(false));
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(bridge.journal.lock().stop_calls, 1);

    write(&bridge.store, Slot::Start, SlotValue::Bool(true));
    tokio::time::sleep(Duration::from_millis(500)).await;
    {
        let j = bridge.journal.lock();
        // The fresh instance is producing output again after the stop.
        assert!(j.current_duty > 0.0);
    }

    bridge.shutdown.send(true).unwrap();
    bridge.monitor_task.await.unwrap();

    let j = bridge.journal.lock();
    // Second instance stopped during shutdown, plus the actuator release.
    assert_eq!(j.stop_calls, 3);
    assert_eq!(j.current_duty, 0.0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_while_sweeping_leaves_output_deenergized() {
    let bridge = spawn_bridge();

    write(&bridge.store, Slot::Start, SlotValue::Bool(true));
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(!bridge.journal.lock().applied.is_empty());

    bridge.shutdown.send(true).unwrap();
    bridge.monitor_task.await.unwrap();

    let j = bridge.journal.lock();
    assert_eq!(j.current_duty, 0.0);
    assert!(j.stop_calls >= 1);
}
