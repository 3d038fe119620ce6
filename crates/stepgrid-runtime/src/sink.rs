//! Consumers of detection results.
//!
//! The worker reports every completed cycle to one [`DetectionSink`], in this
//! order:
//!
//! 1. [`set_tile_status`](DetectionSink::set_tile_status) once per cell, in
//!    logical (axis-mapped) coordinates;
//! 2. [`on_occupancy`](DetectionSink::on_occupancy) with the whole logical grid;
//! 3. [`on_diagnostic`](DetectionSink::on_diagnostic) when a diagnostic image
//!    was rendered.
//!
//! All calls happen on the worker thread, after the cycle's blob analysis is
//! final.  The next cycle does not start until the sink returns.

use std::sync::Arc;

use stepgrid_middleware::{DetectionBus, DiagnosticFrame, OccupancyUpdate};
use stepgrid_types::{DiagnosticImage, OccupancyGrid};
use tracing::trace;

/// Receives the results of each detection cycle.
pub trait DetectionSink: Send {
    /// Status of one tile, in logical coordinates.
    fn set_tile_status(&mut self, col: u32, row: u32, occupied: bool) {
        let _ = (col, row, occupied);
    }

    /// The full logical grid of cycle number `cycle`.
    fn on_occupancy(&mut self, cycle: u64, grid: &OccupancyGrid);

    /// The diagnostic image of cycle number `cycle`.  Ownership moves to the sink.
    fn on_diagnostic(&mut self, cycle: u64, image: DiagnosticImage) {
        let _ = (cycle, image);
    }
}

/// Sink built from closures.
///
/// ```
/// use stepgrid_runtime::sink::FnSink;
///
/// let sink = FnSink::new(|cycle, grid| {
///     println!("cycle {cycle}: {} occupied", grid.occupied_count());
/// });
/// ```
pub struct FnSink<O, D = fn(u64, DiagnosticImage)> {
    on_occupancy: O,
    on_diagnostic: Option<D>,
}

impl<O> FnSink<O>
where
    O: FnMut(u64, &OccupancyGrid) + Send,
{
    pub fn new(on_occupancy: O) -> Self {
        Self {
            on_occupancy,
            on_diagnostic: None,
        }
    }
}

impl<O, D> FnSink<O, D>
where
    O: FnMut(u64, &OccupancyGrid) + Send,
    D: FnMut(u64, DiagnosticImage) + Send,
{
    /// Also forward diagnostic images to `on_diagnostic`.
    pub fn with_diagnostics<D2>(self, on_diagnostic: D2) -> FnSink<O, D2>
    where
        D2: FnMut(u64, DiagnosticImage) + Send,
    {
        FnSink {
            on_occupancy: self.on_occupancy,
            on_diagnostic: Some(on_diagnostic),
        }
    }
}

impl<O, D> DetectionSink for FnSink<O, D>
where
    O: FnMut(u64, &OccupancyGrid) + Send,
    D: FnMut(u64, DiagnosticImage) + Send,
{
    fn on_occupancy(&mut self, cycle: u64, grid: &OccupancyGrid) {
        (self.on_occupancy)(cycle, grid);
    }

    fn on_diagnostic(&mut self, cycle: u64, image: DiagnosticImage) {
        if let Some(f) = self.on_diagnostic.as_mut() {
            f(cycle, image);
        }
    }
}

/// Sink that forwards every result onto a [`DetectionBus`].
///
/// Publishing with no subscribers is not an error here; the result is simply
/// dropped.
#[derive(Clone, Debug)]
pub struct BusSink {
    bus: DetectionBus,
}

impl BusSink {
    pub fn new(bus: DetectionBus) -> Self {
        Self { bus }
    }
}

impl DetectionSink for BusSink {
    fn on_occupancy(&mut self, cycle: u64, grid: &OccupancyGrid) {
        let update = OccupancyUpdate {
            cycle,
            grid: grid.clone(),
        };
        if let Err(e) = self.bus.publish_occupancy(update) {
            trace!(cycle, error = %e, "occupancy update dropped");
        }
    }

    fn on_diagnostic(&mut self, cycle: u64, image: DiagnosticImage) {
        let frame = DiagnosticFrame {
            cycle,
            image: Arc::new(image),
        };
        if let Err(e) = self.bus.publish_diagnostic(frame) {
            trace!(cycle, error = %e, "diagnostic frame dropped");
        }
    }
}

/// Forwards to two sinks in turn.
pub struct Tee<A, B>(pub A, pub B);

impl<A: DetectionSink, B: DetectionSink> DetectionSink for Tee<A, B> {
    fn set_tile_status(&mut self, col: u32, row: u32, occupied: bool) {
        self.0.set_tile_status(col, row, occupied);
        self.1.set_tile_status(col, row, occupied);
    }

    fn on_occupancy(&mut self, cycle: u64, grid: &OccupancyGrid) {
        self.0.on_occupancy(cycle, grid);
        self.1.on_occupancy(cycle, grid);
    }

    fn on_diagnostic(&mut self, cycle: u64, image: DiagnosticImage) {
        self.0.on_diagnostic(cycle, image.clone());
        self.1.on_diagnostic(cycle, image);
    }
}
