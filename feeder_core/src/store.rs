//! Variable-store surface: named slots shared with external writers.
//!
//! The store is the cross-process configuration channel. The contract the
//! core relies on is deliberately weak: each slot read/write is atomic on
//! its own, with **no ordering or transactional guarantee across slots**.
//! A client update may therefore be observed split across two monitor
//! ticks; the monitor tolerates that window (bounded by the poll period).
//!
//! [`MemStore`] is the in-process backing implementation; protocol-backed
//! stores implement the same trait and are swappable without touching the
//! core.

use crate::error::StoreError;
use parking_lot::RwLock;

/// The named control slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Desired run flag (bool).
    Start,
    /// Sweep speed in [0,100] (int).
    SpeedPercent,
    /// Sweep lower bound [degrees] (int).
    MinAngle,
    /// Sweep upper bound [degrees] (int).
    MaxAngle,
    /// Fixed hold angle [degrees] (int), or explicitly unset for sweep
    /// mode. Never a zero sentinel: 0° is a valid fixed target.
    FixedAngle,
}

impl Slot {
    /// All slots, in reconciliation order.
    pub const ALL: [Slot; 5] = [
        Slot::Start,
        Slot::SpeedPercent,
        Slot::MinAngle,
        Slot::MaxAngle,
        Slot::FixedAngle,
    ];

    /// Stable slot name used in logs and wire payloads.
    pub fn name(self) -> &'static str {
        match self {
            Slot::Start => "start",
            Slot::SpeedPercent => "speed_percent",
            Slot::MinAngle => "min_angle",
            Slot::MaxAngle => "max_angle",
            Slot::FixedAngle => "fixed_angle",
        }
    }

    fn index(self) -> usize {
        match self {
            Slot::Start => 0,
            Slot::SpeedPercent => 1,
            Slot::MinAngle => 2,
            Slot::MaxAngle => 3,
            Slot::FixedAngle => 4,
        }
    }
}

/// Current value of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotValue {
    Bool(bool),
    Int(i64),
    /// No value present (only meaningful for `FixedAngle`).
    Unset,
}

/// Atomic single-slot read/write surface.
///
/// Implementations must make each individual operation atomic; nothing
/// more is required or assumed.
pub trait VariableStore: Send + Sync {
    /// Read the current value of a slot.
    fn read_slot(&self, slot: Slot) -> Result<SlotValue, StoreError>;

    /// Write a new value into a slot.
    fn write_slot(&self, slot: Slot, value: SlotValue) -> Result<(), StoreError>;

    /// Read a boolean slot.
    fn read_bool(&self, slot: Slot) -> Result<bool, StoreError> {
        match self.read_slot(slot)? {
            SlotValue::Bool(b) => Ok(b),
            _ => Err(StoreError::TypeMismatch { slot: slot.name() }),
        }
    }

    /// Read an integer slot.
    fn read_int(&self, slot: Slot) -> Result<i64, StoreError> {
        match self.read_slot(slot)? {
            SlotValue::Int(v) => Ok(v),
            _ => Err(StoreError::TypeMismatch { slot: slot.name() }),
        }
    }

    /// Read an integer slot that may be explicitly unset.
    fn read_opt_int(&self, slot: Slot) -> Result<Option<i64>, StoreError> {
        match self.read_slot(slot)? {
            SlotValue::Int(v) => Ok(Some(v)),
            SlotValue::Unset => Ok(None),
            _ => Err(StoreError::TypeMismatch { slot: slot.name() }),
        }
    }
}

/// In-process variable store.
///
/// One lock per slot — mirroring the protocol contract of per-slot
/// atomicity without cross-slot grouping.
pub struct MemStore {
    slots: [RwLock<SlotValue>; 5],
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            slots: [
                RwLock::new(SlotValue::Bool(false)),
                RwLock::new(SlotValue::Int(50)),
                RwLock::new(SlotValue::Int(-45)),
                RwLock::new(SlotValue::Int(45)),
                RwLock::new(SlotValue::Unset),
            ],
        }
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableStore for MemStore {
    fn read_slot(&self, slot: Slot) -> Result<SlotValue, StoreError> {
        Ok(*self.slots[slot.index()].read())
    }

    fn write_slot(&self, slot: Slot, value: SlotValue) -> Result<(), StoreError> {
        *self.slots[slot.index()].write() = value;
        Ok(())
    }
}
