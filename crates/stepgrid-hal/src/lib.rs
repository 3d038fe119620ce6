//! `stepgrid-hal` – the sensor boundary.
//!
//! The detector never talks to a device driver directly.  A driver
//! implements [`FrameSource`] and the producer thread turns each captured
//! frame into a published snapshot.
//!
//! # Modules
//!
//! - [`source`] – the [`FrameSource`] trait every depth sensor driver implements.
//! - [`sim`] – [`SimDepthSensor`], a synthetic sensor with a moving target for
//!   headless runs and tests.

pub mod sim;
pub mod source;

pub use sim::{SimDepthSensor, SimTarget};
pub use source::FrameSource;
