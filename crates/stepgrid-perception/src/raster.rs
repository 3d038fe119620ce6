//! Small raster helpers on top of the `image` buffers and `imageproc` drawing.
//!
//! The pipeline works on [`GrayImage`] for every analysis stage and only
//! converts to [`RgbImage`] when a diagnostic composite is requested.

use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::map::{map_colors, map_colors2};
use stepgrid_types::{ColorFrame, PixelFormat, Rect};

/// How a rectangle is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stroke {
    /// Border band of the given width in pixels, drawn inside the rectangle.
    Outline(u32),
    /// Solid fill.
    Fill,
}

/// Replicate a grayscale image into three equal channels.
pub fn gray_to_rgb(gray: &GrayImage) -> RgbImage {
    map_colors(gray, |p| Rgb([p[0], p[0], p[0]]))
}

/// View a sensor color frame as an [`RgbImage`].
///
/// Returns `None` when the byte count does not match the declared size.
pub fn color_frame_to_rgb(frame: &ColorFrame) -> Option<RgbImage> {
    RgbImage::from_raw(frame.width, frame.height, frame.data.clone())
}

/// Paint `rect` onto `img`, clipped to the image bounds.
///
/// An outline of width `t` is `t` concentric one-pixel rectangles, each
/// inset by one more pixel than the last.
pub fn draw_rect(img: &mut RgbImage, rect: Rect, color: Rgb<u8>, stroke: Stroke) {
    match stroke {
        Stroke::Fill => {
            if let Some(r) = to_imageproc(rect) {
                draw_filled_rect_mut(img, r, color);
            }
        }
        Stroke::Outline(t) => {
            for i in 0..t as i32 {
                let inset = Rect::new(rect.x + i, rect.y + i, rect.width - 2 * i, rect.height - 2 * i);
                let Some(r) = to_imageproc(inset) else {
                    break;
                };
                draw_hollow_rect_mut(img, r, color);
            }
        }
    }
}

fn to_imageproc(rect: Rect) -> Option<imageproc::rect::Rect> {
    (!rect.is_empty())
        .then(|| imageproc::rect::Rect::at(rect.x, rect.y).of_size(rect.width as u32, rect.height as u32))
}

/// Per-channel `a * alpha + b * beta`, rounded and saturated to `u8`.
///
/// Both images must have the same dimensions.
pub fn add_weighted(a: &RgbImage, alpha: f32, b: &RgbImage, beta: f32) -> RgbImage {
    map_colors2(a, b, |pa: Rgb<u8>, pb: Rgb<u8>| {
        let mix = |c: usize| (pa[c] as f32 * alpha + pb[c] as f32 * beta).round().clamp(0.0, 255.0) as u8;
        Rgb([mix(0), mix(1), mix(2)])
    })
}

/// Pack an RGB image into a four-channel buffer with opaque alpha.
pub fn pack(img: &RgbImage, format: PixelFormat) -> Vec<u8> {
    let mut out = Vec::with_capacity(img.width() as usize * img.height() as usize * 4);
    for px in img.pixels() {
        let [r, g, b] = px.0;
        match format {
            PixelFormat::Rgba => out.extend_from_slice(&[r, g, b, 255]),
            PixelFormat::Bgra => out.extend_from_slice(&[b, g, r, 255]),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outline_leaves_interior_untouched() {
        let mut img = RgbImage::new(10, 10);
        let red = Rgb([255, 0, 0]);
        draw_rect(&mut img, Rect::new(1, 1, 8, 8), red, Stroke::Outline(2));
        assert_eq!(*img.get_pixel(1, 1), red);
        assert_eq!(*img.get_pixel(2, 5), red);
        assert_eq!(*img.get_pixel(8, 8), red);
        assert_eq!(*img.get_pixel(5, 5), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(0, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn draw_rect_clips_to_image() {
        let mut img = RgbImage::new(4, 4);
        draw_rect(&mut img, Rect::new(-5, -5, 20, 20), Rgb([1, 2, 3]), Stroke::Fill);
        assert!(img.pixels().all(|p| *p == Rgb([1, 2, 3])));
    }

    #[test]
    fn thick_outline_on_thin_rect_fills_it() {
        let mut img = RgbImage::new(6, 6);
        let green = Rgb([0, 255, 0]);
        draw_rect(&mut img, Rect::new(1, 1, 3, 4), green, Stroke::Outline(5));
        assert_eq!(*img.get_pixel(2, 2), green);
        assert_eq!(*img.get_pixel(3, 4), green);
        assert_eq!(*img.get_pixel(4, 4), Rgb([0, 0, 0]));

        draw_rect(&mut img, Rect::new(0, 0, 0, 5), Rgb([9, 9, 9]), Stroke::Fill);
        assert_eq!(*img.get_pixel(0, 0), Rgb([0, 0, 0]));
    }

    #[test]
    fn add_weighted_mixes_channels() {
        let a = RgbImage::from_pixel(2, 2, Rgb([100, 200, 0]));
        let b = RgbImage::from_pixel(2, 2, Rgb([0, 0, 250]));
        let out = add_weighted(&a, 0.7, &b, 0.3);
        assert_eq!(*out.get_pixel(0, 0), Rgb([70, 140, 75]));
    }

    #[test]
    fn pack_honours_channel_order() {
        let img = RgbImage::from_pixel(1, 1, Rgb([10, 20, 30]));
        assert_eq!(pack(&img, PixelFormat::Rgba), vec![10, 20, 30, 255]);
        assert_eq!(pack(&img, PixelFormat::Bgra), vec![30, 20, 10, 255]);
    }
}
