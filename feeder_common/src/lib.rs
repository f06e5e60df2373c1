//! Feeder Common Library
//!
//! Shared constants and configuration loading utilities for the feeder
//! workspace crates.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Servo calibration constants and default timing

pub mod config;
pub mod consts;
