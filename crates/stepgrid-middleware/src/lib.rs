//! `stepgrid-middleware` – result fan-out.
//!
//! Carries detection results from the worker thread to any number of
//! consumers without the worker ever waiting on them.
//!
//! # Modules
//!
//! - [`bus`] – [`DetectionBus`]: two typed Tokio broadcast lanes, one for
//!   occupancy updates and one for diagnostic frames.

pub mod bus;

pub use bus::{DetectionBus, DiagnosticFrame, Lane, LaneReceiver, OccupancyUpdate};
