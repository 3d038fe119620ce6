//! `stepgrid-perception` – the depth image pipeline.
//!
//! Turns one depth frame into the set of occupied floor tiles:
//!
//! ```text
//! DepthFrame ─► depth_band ─► noise ─► blobs ─► grid ─► OccupancyGrid
//!                    │           │        │        │
//!                    └───────────┴────────┴────────┴──► diagnostic
//! ```
//!
//! # Modules
//!
//! - [`depth_band`] – zeroes samples outside the depth band and stretches the
//!   survivors to the full 8-bit range.
//! - [`noise`] – pyramid down/up, Gaussian blur and morphological opening.
//! - [`contours`] – Suzuki–Abe border following and Douglas–Peucker
//!   simplification.
//! - [`blobs`] – threshold band, contour bounding boxes and the minimum-size
//!   filter.
//! - [`grid`] – blob-to-cell intersection producing the
//!   [`OccupancyGrid`][stepgrid_types::OccupancyGrid].
//! - [`diagnostic`] – optional visualization of any stage.
//! - [`raster`] – small drawing and blending helpers over `image` buffers.
//! - [`pipeline`] – [`DetectionPipeline`], one full pass over a snapshot.

pub mod blobs;
pub mod contours;
pub mod depth_band;
pub mod diagnostic;
pub mod grid;
pub mod noise;
pub mod pipeline;
pub mod raster;

pub use pipeline::{DetectionPipeline, PipelineOutput};
