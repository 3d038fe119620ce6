//! One synchronous detection pass over a frame snapshot.

use stepgrid_types::{
    DetectionSettings, DiagnosticImage, FrameSnapshot, OccupancyGrid, Rect, StepGridError,
};
use tracing::debug;

use crate::diagnostic::{self, Stages};
use crate::{blobs, depth_band, grid, noise};

/// Result of [`DetectionPipeline::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutput {
    /// Occupancy in image space, before axis mapping.
    pub grid: OccupancyGrid,
    /// Accepted blob bounding boxes.
    pub blobs: Vec<Rect>,
    /// Present when the settings select a diagnostic mode.
    pub diagnostic: Option<DiagnosticImage>,
}

/// Runs band filter, noise suppression, blob extraction, grid intersection
/// and diagnostic rendering for frames of a fixed size.
///
/// ```
/// use stepgrid_perception::DetectionPipeline;
/// use stepgrid_types::{DepthFrame, DetectionSettings, FrameSnapshot};
///
/// let pipeline = DetectionPipeline::new(200, 150);
/// let snapshot = FrameSnapshot::depth_only(0, DepthFrame::blank(200, 150));
/// let out = pipeline.run(&snapshot, &DetectionSettings::default()).unwrap();
/// assert!(out.grid.is_vacant());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionPipeline {
    width: u32,
    height: u32,
}

impl DetectionPipeline {
    /// Pipeline for frames of `width × height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Process one snapshot with one settings value.
    ///
    /// # Errors
    ///
    /// - [`StepGridError::FrameDimensionMismatch`] when the depth frame is not
    ///   the size this pipeline was built for.
    /// - [`StepGridError::BufferLength`] when the sample count does not match
    ///   the frame's declared size.
    pub fn run(
        &self,
        snapshot: &FrameSnapshot,
        settings: &DetectionSettings,
    ) -> Result<PipelineOutput, StepGridError> {
        let depth = &snapshot.depth;
        if depth.width != self.width || depth.height != self.height {
            return Err(StepGridError::FrameDimensionMismatch {
                expected_width: self.width,
                expected_height: self.height,
                width: depth.width,
                height: depth.height,
            });
        }
        depth.validate()?;

        let banded = depth_band::apply(depth, settings.depth);
        debug!(surviving = banded.surviving, "depth band applied");

        let smoothed = noise::suppress(&banded.filtered);

        let extraction = blobs::extract(&smoothed, settings.threshold);
        debug!(blobs = extraction.blobs.len(), "blobs extracted");

        let occupancy = grid::intersect(&extraction.blobs, &settings.grid);
        debug!(occupied = occupancy.occupied_count(), "grid intersected");

        let diagnostic = diagnostic::render(
            settings.diagnostic_mode,
            settings.pixel_format,
            &Stages {
                raw: &banded.raw,
                filtered: &banded.filtered,
                smoothed: &smoothed,
                binary: &extraction.binary,
                blobs: &extraction.blobs,
                grid: &occupancy,
                geometry: &settings.grid,
                color: snapshot.color.as_ref(),
            },
        );

        Ok(PipelineOutput {
            grid: occupancy,
            blobs: extraction.blobs,
            diagnostic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepgrid_types::{DepthFrame, DiagnosticMode};

    /// Background at 3000 (outside the default band) with a block at 1000.
    fn scene(block: Rect) -> FrameSnapshot {
        let mut frame = DepthFrame::filled(200, 150, 3000);
        for y in block.y..block.bottom() {
            for x in block.x..block.right() {
                frame.data[y as usize * 200 + x as usize] = 1000;
            }
        }
        FrameSnapshot::depth_only(1, frame)
    }

    #[test]
    fn block_in_band_occupies_its_cell() {
        let pipeline = DetectionPipeline::new(200, 150);
        let out = pipeline
            .run(&scene(Rect::new(110, 60, 30, 30)), &DetectionSettings::default())
            .unwrap();
        assert_eq!(out.blobs.len(), 1);
        assert!(out.grid.get(2, 1));
        assert_eq!(out.grid.occupied_count(), 1);
        assert!(out.diagnostic.is_none());
    }

    #[test]
    fn repeated_runs_are_identical() {
        let pipeline = DetectionPipeline::new(200, 150);
        let snapshot = scene(Rect::new(30, 20, 60, 80));
        let settings = DetectionSettings {
            diagnostic_mode: DiagnosticMode::Blended,
            ..DetectionSettings::default()
        };
        let first = pipeline.run(&snapshot, &settings).unwrap();
        for _ in 0..3 {
            assert_eq!(pipeline.run(&snapshot, &settings).unwrap(), first);
        }
    }

    #[test]
    fn all_zero_frame_yields_vacant_grid() {
        let pipeline = DetectionPipeline::new(200, 150);
        let snapshot = FrameSnapshot::depth_only(0, DepthFrame::blank(200, 150));
        let settings = DetectionSettings {
            diagnostic_mode: DiagnosticMode::Filtered,
            ..DetectionSettings::default()
        };
        let out = pipeline.run(&snapshot, &settings).unwrap();
        assert!(out.blobs.is_empty());
        assert!(out.grid.is_vacant());
        assert_eq!(out.grid.cols(), 4);
        let image = out.diagnostic.unwrap();
        assert!(image.data.chunks(4).all(|px| px[..3] == [0, 0, 0]));
    }

    #[test]
    fn mismatched_frame_is_rejected() {
        let pipeline = DetectionPipeline::new(200, 150);
        let snapshot = FrameSnapshot::depth_only(0, DepthFrame::blank(100, 100));
        let err = pipeline.run(&snapshot, &DetectionSettings::default()).unwrap_err();
        assert!(matches!(err, StepGridError::FrameDimensionMismatch { width: 100, .. }));
    }

    #[test]
    fn malformed_buffer_is_rejected() {
        let pipeline = DetectionPipeline::new(4, 4);
        let snapshot = FrameSnapshot::depth_only(
            0,
            DepthFrame {
                width: 4,
                height: 4,
                data: vec![0; 3],
            },
        );
        assert!(matches!(
            pipeline.run(&snapshot, &DetectionSettings::default()),
            Err(StepGridError::BufferLength { .. })
        ));
    }

    #[test]
    fn zero_sized_grid_short_circuits() {
        let pipeline = DetectionPipeline::new(200, 150);
        let mut settings = DetectionSettings::default();
        settings.grid.rows = 0;
        let out = pipeline.run(&scene(Rect::new(10, 10, 40, 40)), &settings).unwrap();
        assert!(out.grid.is_empty());
        assert_eq!(out.blobs.len(), 1);
    }
}
