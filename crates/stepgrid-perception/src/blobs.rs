//! Blob extraction: threshold band, contour tracing, bounding boxes.

use image::{GrayImage, Luma};
use stepgrid_types::{Rect, ThresholdBand};
use tracing::trace;

use crate::contours::{approx_poly, bounding_rect, find_contours, perimeter};

/// Blobs narrower or shorter than this many pixels are discarded.
pub const MIN_BLOB_SIZE: i32 = 20;

/// Douglas–Peucker tolerance as a fraction of the contour perimeter.
pub const APPROX_EPSILON_RATIO: f64 = 0.015;

/// Output of [`extract`].
#[derive(Debug, Clone)]
pub struct BlobExtraction {
    /// Binary image: `255` inside the threshold band, `0` elsewhere.
    pub binary: GrayImage,
    /// Bounding boxes of the accepted blobs, in discovery order.
    pub blobs: Vec<Rect>,
}

/// Binarize `img`: pixels inside `band` become `255`, all others `0`.
pub fn threshold(img: &GrayImage, band: ThresholdBand) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let v = img.get_pixel(x, y)[0];
        Luma([if band.contains(v) { 255 } else { 0 }])
    })
}

/// Threshold `smoothed` and collect the bounding boxes of its regions.
///
/// Every outer border is considered, at any nesting depth; hole borders are
/// skipped.  A box smaller than [`MIN_BLOB_SIZE`] in either dimension is
/// dropped.
pub fn extract(smoothed: &GrayImage, band: ThresholdBand) -> BlobExtraction {
    let binary = threshold(smoothed, band);
    let blobs = find_contours(&binary)
        .into_iter()
        .filter(|c| !c.hole)
        .filter_map(|c| {
            let poly = approx_poly(&c.points, perimeter(&c.points) * APPROX_EPSILON_RATIO);
            let rect = bounding_rect(&poly);
            if rect.width < MIN_BLOB_SIZE || rect.height < MIN_BLOB_SIZE {
                trace!(?rect, "blob below minimum size");
                None
            } else {
                Some(rect)
            }
        })
        .collect();

    BlobExtraction { binary, blobs }
}
