//! `stepgrid-types` – shared vocabulary for the StepGrid workspace.
//!
//! Every crate in the workspace speaks in these types: the sensor boundary
//! produces [`FrameSnapshot`]s, the perception pipeline consumes them together
//! with a [`DetectionSettings`] value and produces an [`OccupancyGrid`] plus an
//! optional [`DiagnosticImage`].
//!
//! # Modules
//!
//! - [`frame`] – raw sensor buffers ([`DepthFrame`], [`ColorFrame`]) and the
//!   per-cycle [`FrameSnapshot`] handed from producer to detector.
//! - [`settings`] – the immutable [`DetectionSettings`] snapshot and its parts.
//! - [`geometry`] – integer pixel rectangles ([`Rect`]) and the
//!   [`OccupancyGrid`] produced once per detection cycle.
//! - [`error`] – the workspace-wide [`StepGridError`].

pub mod error;
pub mod frame;
pub mod geometry;
pub mod settings;

pub use error::StepGridError;
pub use frame::{ColorFrame, DepthFrame, DiagnosticImage, FrameSnapshot};
pub use geometry::{OccupancyGrid, Rect};
pub use settings::{
    AxisMapping, DepthBand, DetectionSettings, DiagnosticMode, GridGeometry, PixelFormat,
    ThresholdBand,
};
