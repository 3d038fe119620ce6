//! Depth banding: raw 16-bit depth to a normalized 8-bit intensity image.
//!
//! Samples outside the configured [`DepthBand`] are zeroed, survivors are
//! shifted so the band starts at zero, and the result is stretched linearly
//! over its own min–max range to `0..=255`.  The raw frame is normalized the
//! same way for diagnostic display.

use image::{GrayImage, Luma};
use stepgrid_types::{DepthBand, DepthFrame};

/// Output of [`apply`].
#[derive(Debug, Clone)]
pub struct BandedDepth {
    /// Min–max normalized raw depth.
    pub raw: GrayImage,
    /// Min–max normalized band-filtered depth.
    pub filtered: GrayImage,
    /// Number of samples inside the band.
    pub surviving: usize,
}

/// Per-pixel survival mask of `frame` for `band`, row-major.
pub fn band_mask(frame: &DepthFrame, band: DepthBand) -> Vec<bool> {
    frame.data.iter().map(|&s| band.contains(s)).collect()
}

/// Run the band filter and both normalizations.
///
/// The frame must already be validated; a short buffer yields zeros for the
/// missing pixels.
pub fn apply(frame: &DepthFrame, band: DepthBand) -> BandedDepth {
    let mut surviving = 0usize;
    let offsets: Vec<u16> = frame
        .data
        .iter()
        .map(|&s| {
            if band.contains(s) {
                surviving += 1;
                s - band.min
            } else {
                0
            }
        })
        .collect();

    BandedDepth {
        raw: normalize(&frame.data, frame.width, frame.height),
        filtered: normalize(&offsets, frame.width, frame.height),
        surviving,
    }
}

/// Linear min–max stretch of `values` to `0..=255`.
///
/// A constant image (zero range) maps to all zeros.
pub fn normalize(values: &[u16], width: u32, height: u32) -> GrayImage {
    let (lo, hi) = values
        .iter()
        .fold((u16::MAX, u16::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if values.is_empty() || hi <= lo {
        return GrayImage::new(width, height);
    }

    let range = (hi - lo) as u32;
    GrayImage::from_fn(width, height, |x, y| {
        let i = y as usize * width as usize + x as usize;
        let v = values.get(i).copied().unwrap_or(lo).max(lo);
        let scaled = ((v - lo) as u32 * 255 + range / 2) / range;
        Luma([scaled as u8])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(width: u32, height: u32, data: Vec<u16>) -> DepthFrame {
        DepthFrame::new(width, height, data).unwrap()
    }

    #[test]
    fn out_of_band_samples_are_zeroed() {
        let f = frame(4, 1, vec![400, 600, 1000, 1600]);
        let banded = apply(&f, DepthBand::new(500, 1500));
        assert_eq!(banded.surviving, 2);
        let px: Vec<u8> = banded.filtered.pixels().map(|p| p[0]).collect();
        assert_eq!(px[0], 0);
        assert_eq!(px[3], 0);
        // 600 -> offset 100, 1000 -> offset 500 (the maximum).
        assert_eq!(px[2], 255);
        assert_eq!(px[1], 51);
    }

    #[test]
    fn all_zero_frame_yields_empty_filtered_image() {
        let f = DepthFrame::blank(8, 6);
        let banded = apply(&f, DepthBand::new(500, 1500));
        assert_eq!(banded.surviving, 0);
        assert!(banded.filtered.pixels().all(|p| p[0] == 0));
        assert!(banded.raw.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn inverted_band_does_not_panic() {
        let f = frame(3, 1, vec![700, 800, 900]);
        let banded = apply(&f, DepthBand::new(1500, 500));
        assert_eq!(banded.surviving, 0);
        assert!(banded.filtered.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn raw_normalization_spans_full_range() {
        let f = frame(3, 1, vec![1000, 2000, 3000]);
        let banded = apply(&f, DepthBand::new(0, 0));
        let px: Vec<u8> = banded.raw.pixels().map(|p| p[0]).collect();
        assert_eq!(px, vec![0, 128, 255]);
    }

    #[test]
    fn widening_band_never_loses_pixels() {
        let data: Vec<u16> = (0..400u16).map(|i| (i * 37) % 3000).collect();
        let f = frame(20, 20, data);
        let bands = [
            DepthBand::new(900, 1100),
            DepthBand::new(700, 1100),
            DepthBand::new(700, 1900),
            DepthBand::new(1, 2999),
        ];
        for pair in bands.windows(2) {
            let narrow = band_mask(&f, pair[0]);
            let wide = band_mask(&f, pair[1]);
            assert!(narrow.iter().zip(&wide).all(|(&n, &w)| !n || w));
            assert_eq!(apply(&f, pair[0]).surviving, narrow.iter().filter(|&&m| m).count());
        }
    }
}
