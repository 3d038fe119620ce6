//! Speckle suppression for the banded depth image.
//!
//! Order of operations:
//! 1. Pyramid down then up (Gaussian `[1, 4, 6, 4, 1]` kernel), which drops
//!    fine speckle while keeping the original resolution.
//! 2. 3×3 Gaussian blur.
//! 3. Morphological opening with a 5×5 ellipse: two erosions, then two
//!    dilations.  Isolated islands vanish, large shapes keep their extent.
//!
//! Blurring runs before the opening so that sensor shot noise is gone before
//! morphology can grow it.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::filter3x3;
use imageproc::morphology::{grayscale_dilate, grayscale_erode, Mask};

/// Iterations used for both erosion and dilation.
pub const OPENING_ITERATIONS: usize = 2;

/// 5×5 elliptical structuring element, anchor at the centre.
const ELLIPSE_5X5: [[bool; 5]; 5] = [
    [false, false, true, false, false],
    [true, true, true, true, true],
    [true, true, true, true, true],
    [true, true, true, true, true],
    [false, false, true, false, false],
];

/// Run the full suppression chain.  Output has the input's dimensions.
pub fn suppress(img: &GrayImage) -> GrayImage {
    if img.width() == 0 || img.height() == 0 {
        return img.clone();
    }
    let down = pyr_down(img);
    let up = pyr_up(&down, img.width(), img.height());
    let blurred = gaussian3(&up);
    let eroded = erode(&blurred, OPENING_ITERATIONS);
    dilate(&eroded, OPENING_ITERATIONS)
}

/// Blur with the 5-tap Gaussian and keep every other pixel.
pub fn pyr_down(img: &GrayImage) -> GrayImage {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let src: Vec<f32> = img.pixels().map(|p| p[0] as f32).collect();
    let blurred = separable(&src, w, h, &[1.0, 4.0, 6.0, 4.0, 1.0], 16.0);

    let (nw, nh) = (w.div_ceil(2), h.div_ceil(2));
    GrayImage::from_fn(nw as u32, nh as u32, |x, y| {
        let v = blurred[(y as usize * 2) * w + x as usize * 2];
        Luma([to_u8(v)])
    })
}

/// Upsample by two and interpolate with the 5-tap Gaussian, cropped to `width × height`.
///
/// Even output pixels take `(1, 6, 1) / 8` of the source neighbourhood, odd
/// ones `(4, 4) / 8`, which is the zero-stuffed Gaussian scaled by four.
pub fn pyr_up(img: &GrayImage, width: u32, height: u32) -> GrayImage {
    let (sw, sh) = (img.width() as usize, img.height() as usize);
    let w = width as usize;
    if sw == 0 || sh == 0 {
        return GrayImage::new(width, height);
    }
    let src: Vec<f32> = img.pixels().map(|p| p[0] as f32).collect();

    let mut horiz = vec![0.0f32; w * sh];
    for y in 0..sh {
        let row = &src[y * sw..(y + 1) * sw];
        for x in 0..w {
            horiz[y * w + x] = upsample_tap(|i| row[i], sw, x);
        }
    }

    GrayImage::from_fn(width, height, |x, y| {
        let x = x as usize;
        let v = upsample_tap(|i| horiz[i * w + x], sh, y as usize);
        Luma([to_u8(v)])
    })
}

/// 3×3 Gaussian kernel, `[1, 2, 1] / 4` per axis.
const GAUSSIAN_3X3: [f32; 9] = [
    1.0 / 16.0,
    2.0 / 16.0,
    1.0 / 16.0,
    2.0 / 16.0,
    4.0 / 16.0,
    2.0 / 16.0,
    1.0 / 16.0,
    2.0 / 16.0,
    1.0 / 16.0,
];

/// 3×3 Gaussian blur with replicated borders.
pub fn gaussian3(img: &GrayImage) -> GrayImage {
    let blurred: ImageBuffer<Luma<f32>, Vec<f32>> = filter3x3(img, &GAUSSIAN_3X3);
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        Luma([to_u8(blurred.get_pixel(x, y)[0])])
    })
}

/// Grayscale erosion (neighbourhood minimum) with the 5×5 ellipse.
///
/// Pixels outside the image never influence the result.
pub fn erode(img: &GrayImage, iterations: usize) -> GrayImage {
    let mask = ellipse();
    (0..iterations).fold(img.clone(), |acc, _| grayscale_erode(&acc, &mask))
}

/// Grayscale dilation (neighbourhood maximum) with the 5×5 ellipse.
pub fn dilate(img: &GrayImage, iterations: usize) -> GrayImage {
    let mask = ellipse();
    (0..iterations).fold(img.clone(), |acc, _| grayscale_dilate(&acc, &mask))
}

fn ellipse() -> Mask {
    let shape = GrayImage::from_fn(5, 5, |x, y| {
        Luma([if ELLIPSE_5X5[y as usize][x as usize] { 255 } else { 0 }])
    });
    Mask::from_image(&shape, 2, 2)
}

/// Separable symmetric convolution with replicated borders.
fn separable(src: &[f32], w: usize, h: usize, kernel: &[f32], norm: f32) -> Vec<f32> {
    let r = (kernel.len() / 2) as isize;
    let clamp = |v: isize, n: usize| v.clamp(0, n as isize - 1) as usize;

    let mut tmp = vec![0.0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, &kv) in kernel.iter().enumerate() {
                let sx = clamp(x as isize + k as isize - r, w);
                acc += kv * src[y * w + sx];
            }
            tmp[y * w + x] = acc / norm;
        }
    }

    let mut out = vec![0.0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0;
            for (k, &kv) in kernel.iter().enumerate() {
                let sy = clamp(y as isize + k as isize - r, h);
                acc += kv * tmp[sy * w + x];
            }
            out[y * w + x] = acc / norm;
        }
    }
    out
}

/// One output sample of a 2× upsample along an axis of `n` source samples.
fn upsample_tap(at: impl Fn(usize) -> f32, n: usize, pos: usize) -> f32 {
    let src = |j: isize| at(j.clamp(0, n as isize - 1) as usize);
    let i = (pos / 2) as isize;
    if pos % 2 == 0 {
        (src(i - 1) + 6.0 * src(i) + src(i + 1)) / 8.0
    } else {
        (4.0 * src(i) + 4.0 * src(i + 1)) / 8.0
    }
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
