//! `stepgrid-kernel` – supervision.
//!
//! # Modules
//!
//! - [`watchdog`] – [`Watchdog`][watchdog::Watchdog]: watches the progress
//!   counters of long-running components (the detection worker, the sensor
//!   producer) and reports the ones that stopped advancing.

pub mod watchdog;

pub use watchdog::{ComponentHealth, Watchdog};
