//! The detection settings snapshot.
//!
//! A [`DetectionSettings`] value is never mutated once handed to the
//! detector.  Controllers build a new value and swap it in wholesale, so a
//! detection cycle always sees one internally consistent configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StepGridError;
use crate::geometry::Rect;

// ────────────────────────────────────────────────────────────────────────────
// Bands
// ────────────────────────────────────────────────────────────────────────────

/// Inclusive range of raw depth values treated as foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthBand {
    pub min: u16,
    pub max: u16,
}

impl DepthBand {
    pub fn new(min: u16, max: u16) -> Self {
        Self { min, max }
    }

    /// True when `sample` is a valid return inside the band.
    ///
    /// A sample of `0` (no return) never survives, even when `min` is `0`.
    /// An inverted band (`min > max`) contains nothing.
    pub fn contains(&self, sample: u16) -> bool {
        sample != 0 && sample >= self.min && sample <= self.max
    }
}

impl Default for DepthBand {
    fn default() -> Self {
        Self {
            min: 500,
            max: 1500,
        }
    }
}

/// Inclusive intensity range kept when binarizing the smoothed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdBand {
    pub min: u8,
    pub max: u8,
}

impl ThresholdBand {
    pub fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: u8) -> bool {
        value >= self.min && value <= self.max
    }
}

impl Default for ThresholdBand {
    fn default() -> Self {
        Self { min: 50, max: 255 }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Grid geometry
// ────────────────────────────────────────────────────────────────────────────

/// Placement of the logical tile grid in image-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridGeometry {
    pub cols: u32,
    pub rows: u32,
    /// Top-left corner of cell `(0, 0)`.
    pub origin_x: f32,
    pub origin_y: f32,
    /// Size of one cell.
    pub cell_width: f32,
    pub cell_height: f32,
    /// Inset applied on every side of a cell before the overlap test.
    pub tolerance_x: f32,
    pub tolerance_y: f32,
}

impl GridGeometry {
    /// Number of cells; `0` when either dimension is zero.
    pub fn cell_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// True when the grid has no cells at all.
    pub fn is_empty(&self) -> bool {
        self.cols == 0 || self.rows == 0
    }

    /// Full cell rectangle, used for drawing the grid.
    pub fn cell_rect(&self, col: u32, row: u32) -> Rect {
        Rect::new(
            (self.origin_x + col as f32 * self.cell_width) as i32,
            (self.origin_y + row as f32 * self.cell_height) as i32,
            self.cell_width as i32,
            self.cell_height as i32,
        )
    }

    /// Cell rectangle shrunk by the tolerance on every side.
    ///
    /// This is the area a blob must overlap for the cell to count as occupied.
    pub fn inset_rect(&self, col: u32, row: u32) -> Rect {
        Rect::new(
            (self.origin_x + col as f32 * self.cell_width + self.tolerance_x) as i32,
            (self.origin_y + row as f32 * self.cell_height + self.tolerance_y) as i32,
            (self.cell_width - 2.0 * self.tolerance_x) as i32,
            (self.cell_height - 2.0 * self.tolerance_y) as i32,
        )
    }
}

impl Default for GridGeometry {
    fn default() -> Self {
        Self {
            cols: 4,
            rows: 3,
            origin_x: 0.0,
            origin_y: 0.0,
            cell_width: 50.0,
            cell_height: 50.0,
            tolerance_x: 5.0,
            tolerance_y: 5.0,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Axis mapping
// ────────────────────────────────────────────────────────────────────────────

/// How image-space grid indices map onto logical tile coordinates.
///
/// The default reverses both axes, which corresponds to a sensor mounted
/// rotated by 180° relative to the tile field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisMapping {
    pub reverse_cols: bool,
    pub reverse_rows: bool,
}

impl AxisMapping {
    /// Image indices are reported unchanged.
    pub const IDENTITY: Self = Self {
        reverse_cols: false,
        reverse_rows: false,
    };

    /// Map an image-space `(col, row)` of a `cols × rows` grid to logical coordinates.
    pub fn to_logical(&self, col: u32, row: u32, cols: u32, rows: u32) -> (u32, u32) {
        let col = if self.reverse_cols { cols - 1 - col } else { col };
        let row = if self.reverse_rows { rows - 1 - row } else { row };
        (col, row)
    }
}

impl Default for AxisMapping {
    fn default() -> Self {
        Self {
            reverse_cols: true,
            reverse_rows: true,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Diagnostic selection
// ────────────────────────────────────────────────────────────────────────────

/// Which pipeline stage, if any, is rendered as a diagnostic image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticMode {
    /// No diagnostic image is produced.
    #[default]
    None,
    /// Min–max normalized raw depth.
    RawDepth,
    /// Depth after band filtering and normalization.
    Filtered,
    /// Grayscale image after noise suppression.
    Smoothed,
    /// Binary image after the threshold band test.
    Thresholded,
    /// Filtered image with cell and blob rectangles drawn on top.
    Overlay,
    /// Overlay blended 70/30 with a solid occupancy layer.
    Blended,
    /// Blended image mixed 50/50 with the live color frame.
    ColorBlend,
}

impl DiagnosticMode {
    pub const ALL: [DiagnosticMode; 8] = [
        DiagnosticMode::None,
        DiagnosticMode::RawDepth,
        DiagnosticMode::Filtered,
        DiagnosticMode::Smoothed,
        DiagnosticMode::Thresholded,
        DiagnosticMode::Overlay,
        DiagnosticMode::Blended,
        DiagnosticMode::ColorBlend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticMode::None => "none",
            DiagnosticMode::RawDepth => "raw_depth",
            DiagnosticMode::Filtered => "filtered",
            DiagnosticMode::Smoothed => "smoothed",
            DiagnosticMode::Thresholded => "thresholded",
            DiagnosticMode::Overlay => "overlay",
            DiagnosticMode::Blended => "blended",
            DiagnosticMode::ColorBlend => "color_blend",
        }
    }
}

impl fmt::Display for DiagnosticMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagnosticMode {
    type Err = StepGridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        DiagnosticMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == wanted)
            .ok_or_else(|| StepGridError::Config(format!("unknown diagnostic mode '{s}'")))
    }
}

/// Channel order of packed diagnostic buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    #[default]
    Rgba,
    Bgra,
}

// ────────────────────────────────────────────────────────────────────────────
// DetectionSettings
// ────────────────────────────────────────────────────────────────────────────

/// One complete detection configuration.
///
/// Treat as a value: build a new one and hand it to the worker instead of
/// changing fields of a value the worker might be reading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionSettings {
    pub depth: DepthBand,
    pub threshold: ThresholdBand,
    pub grid: GridGeometry,
    pub diagnostic_mode: DiagnosticMode,
    pub pixel_format: PixelFormat,
    pub axis_mapping: AxisMapping,
}
