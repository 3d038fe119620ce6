//! Diagnostic rendering of intermediate pipeline stages.
//!
//! | Mode | Image |
//! |---|---|
//! | `RawDepth` | normalized raw depth |
//! | `Filtered` | normalized band-filtered depth |
//! | `Smoothed` | after noise suppression |
//! | `Thresholded` | binary threshold output |
//! | `Overlay` | filtered depth, inset cell outlines, then blob outlines |
//! | `Blended` | overlay mixed 70/30 with the occupancy fill layer |
//! | `ColorBlend` | blended image mixed 50/50 with the color frame |
//!
//! `ColorBlend` without a usable color frame falls back to `Blended`.

use image::{GrayImage, Rgb, RgbImage};
use stepgrid_types::{
    ColorFrame, DiagnosticImage, DiagnosticMode, GridGeometry, OccupancyGrid, PixelFormat, Rect,
};
use tracing::warn;

use crate::raster::{add_weighted, color_frame_to_rgb, draw_rect, gray_to_rgb, pack, Stroke};

/// Outline of a cell's inset (the area a blob must hit).
pub const BOUNDARY_COLOR: Rgb<u8> = Rgb([0, 0, 200]);
/// Outline of an accepted blob.
pub const BLOB_COLOR: Rgb<u8> = Rgb([0, 255, 255]);
/// Occupancy layer: filled for occupied cells, outlined otherwise.
pub const OCCUPIED_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const LINE_WIDTH: u32 = 2;
const OVERLAY_WEIGHT: f32 = 0.7;
const FILL_WEIGHT: f32 = 0.3;
const COLOR_WEIGHT: f32 = 0.5;

/// Borrowed view of one cycle's intermediate results.
#[derive(Debug, Clone, Copy)]
pub struct Stages<'a> {
    pub raw: &'a GrayImage,
    pub filtered: &'a GrayImage,
    pub smoothed: &'a GrayImage,
    pub binary: &'a GrayImage,
    pub blobs: &'a [Rect],
    /// Occupancy in image space.
    pub grid: &'a OccupancyGrid,
    pub geometry: &'a GridGeometry,
    pub color: Option<&'a ColorFrame>,
}

/// Render `mode` from `stages`.
///
/// Returns `None` for [`DiagnosticMode::None`] and for zero-sized images.
pub fn render(mode: DiagnosticMode, format: PixelFormat, stages: &Stages<'_>) -> Option<DiagnosticImage> {
    let (width, height) = stages.filtered.dimensions();
    if width == 0 || height == 0 {
        return None;
    }
    let rgb = match mode {
        DiagnosticMode::None => return None,
        DiagnosticMode::RawDepth => gray_to_rgb(stages.raw),
        DiagnosticMode::Filtered => gray_to_rgb(stages.filtered),
        DiagnosticMode::Smoothed => gray_to_rgb(stages.smoothed),
        DiagnosticMode::Thresholded => gray_to_rgb(stages.binary),
        DiagnosticMode::Overlay => overlay(stages),
        DiagnosticMode::Blended => blended(stages),
        DiagnosticMode::ColorBlend => color_blend(stages),
    };
    Some(DiagnosticImage {
        width,
        height,
        format,
        data: pack(&rgb, format),
    })
}

fn overlay(stages: &Stages<'_>) -> RgbImage {
    let mut img = gray_to_rgb(stages.filtered);
    let g = stages.geometry;
    for row in 0..g.rows {
        for col in 0..g.cols {
            draw_rect(&mut img, g.inset_rect(col, row), BOUNDARY_COLOR, Stroke::Outline(LINE_WIDTH));
        }
    }
    for blob in stages.blobs {
        draw_rect(&mut img, *blob, BLOB_COLOR, Stroke::Outline(LINE_WIDTH));
    }
    img
}

fn occupancy_layer(stages: &Stages<'_>) -> RgbImage {
    let (w, h) = stages.filtered.dimensions();
    let mut layer = RgbImage::new(w, h);
    for (col, row, occupied) in stages.grid.iter() {
        let stroke = if occupied { Stroke::Fill } else { Stroke::Outline(LINE_WIDTH) };
        draw_rect(&mut layer, stages.geometry.cell_rect(col, row), OCCUPIED_COLOR, stroke);
    }
    layer
}

fn blended(stages: &Stages<'_>) -> RgbImage {
    add_weighted(&overlay(stages), OVERLAY_WEIGHT, &occupancy_layer(stages), FILL_WEIGHT)
}

fn color_blend(stages: &Stages<'_>) -> RgbImage {
    let base = blended(stages);
    let (w, h) = base.dimensions();
    let color = stages
        .color
        .filter(|c| c.matches(w, h))
        .and_then(color_frame_to_rgb);
    match color {
        Some(color) => add_weighted(&base, COLOR_WEIGHT, &color, COLOR_WEIGHT),
        None => {
            warn!(width = w, height = h, "no matching color frame, rendering blended overlay");
            base
        }
    }
}
