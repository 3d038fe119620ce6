//! Contour tracing on binary images (Suzuki–Abe border following).
//!
//! [`find_contours`] walks the image once, row-major, and traces every outer
//! border and every hole border it meets.  Each contour is returned as the
//! ordered list of border pixels.  [`approx_poly`] simplifies a closed
//! contour with Douglas–Peucker and [`bounding_rect`] gives its pixel extent.

use image::GrayImage;
use stepgrid_types::Rect;

/// Integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// One traced border.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<Point>,
    /// True when this border encloses a hole inside a foreground region.
    pub hole: bool,
}

/// 8-neighbourhood in counter-clockwise order, starting east.
const NEIGHBORHOOD: [(i32, i32); 8] = [
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Label plane with a one-pixel zero border around the image.
///
/// Foreground pixels start as `1`; tracing overwrites border pixels with the
/// signed contour number.
struct Labels {
    data: Vec<i32>,
    stride: usize,
    /// Flat offsets of [`NEIGHBORHOOD`], repeated twice so a scan can run
    /// past index 7 without wrapping.
    deltas: [isize; 16],
}

impl Labels {
    fn new(img: &GrayImage) -> Self {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let stride = w + 2;
        let mut data = vec![0i32; stride * (h + 2)];
        for (x, y, px) in img.enumerate_pixels() {
            if px[0] != 0 {
                data[(y as usize + 1) * stride + x as usize + 1] = 1;
            }
        }

        let mut deltas = [0isize; 16];
        for (i, &(dx, dy)) in NEIGHBORHOOD.iter().enumerate() {
            let d = dx as isize + dy as isize * stride as isize;
            deltas[i] = d;
            deltas[i + 8] = d;
        }
        Self {
            data,
            stride,
            deltas,
        }
    }

    fn step(&self, pos: usize, dir: usize) -> usize {
        (pos as isize + self.deltas[dir]) as usize
    }

    /// Trace the border that starts at `pos` and label it with `nbd`.
    fn follow(&mut self, pos: usize, nbd: i32, start: Point, hole: bool) -> Contour {
        let mut points = Vec::new();
        let mut point = start;

        // Clockwise search for the first non-zero neighbour, starting from
        // the background pixel that triggered the trace.
        let mut dir: usize = if hole { 0 } else { 4 };
        let first_dir = dir;
        let mut first;
        loop {
            dir = dir.wrapping_sub(1) & 7;
            first = self.step(pos, dir);
            if self.data[first] != 0 || dir == first_dir {
                break;
            }
        }

        if self.data[first] == 0 {
            // Isolated pixel.
            self.data[pos] = -nbd;
            points.push(point);
            return Contour { points, hole };
        }

        let mut current = pos;
        loop {
            let from = dir;
            let mut next;
            loop {
                dir = (dir + 1) & 15;
                next = self.step(current, dir);
                if self.data[next] != 0 {
                    break;
                }
            }
            dir &= 7;

            // The east neighbour was examined and is background: this pixel
            // sits on the right edge of its region.
            if dir.wrapping_sub(1) < from {
                self.data[current] = -nbd;
            } else if self.data[current] == 1 {
                self.data[current] = nbd;
            }

            points.push(point);
            point.x += NEIGHBORHOOD[dir].0;
            point.y += NEIGHBORHOOD[dir].1;

            if next == pos && current == first {
                break;
            }
            current = next;
            dir = (dir + 4) & 7;
        }

        Contour { points, hole }
    }
}

/// Trace every border of the non-zero regions of `img`.
///
/// Outer borders are reported with `hole == false`, hole borders with
/// `hole == true`.  Contours come out in the order their first pixel is met
/// in a row-major scan.
pub fn find_contours(img: &GrayImage) -> Vec<Contour> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let mut labels = Labels::new(img);
    let mut contours = Vec::new();
    let mut nbd = 1;

    for y in 0..h {
        let mut pos = (y + 1) * labels.stride + 1;
        for x in 0..w {
            let pix = labels.data[pos];
            if pix != 0 {
                let outer = pix == 1 && labels.data[pos - 1] == 0;
                let hole = !outer && pix >= 1 && labels.data[pos + 1] == 0;
                if outer || hole {
                    nbd += 1;
                    let start = Point::new(x as i32, y as i32);
                    contours.push(labels.follow(pos, nbd, start, hole));
                }
            }
            pos += 1;
        }
    }
    contours
}

/// Length of the closed polygon through `points`.
pub fn perimeter(points: &[Point]) -> f64 {
    let Some(&last) = points.last() else {
        return 0.0;
    };
    let mut prev = last;
    let mut total = 0.0;
    for &p in points {
        let dx = (p.x - prev.x) as f64;
        let dy = (p.y - prev.y) as f64;
        total += dx.hypot(dy);
        prev = p;
    }
    total
}

/// Douglas–Peucker simplification of a closed contour.
///
/// The contour is split at the vertex farthest from its first point and each
/// half is simplified as an open chain.  Every returned vertex is one of the
/// input points.
pub fn approx_poly(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let anchor = points[0];
    let (split, _) = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, dist_sq(anchor, *p)))
        .fold((0, 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
    if split == 0 {
        return vec![anchor];
    }

    let mut keep = vec![false; points.len() + 1];
    keep[0] = true;
    keep[split] = true;

    // The second chain closes the loop back onto the anchor.
    let closed: Vec<Point> = points.iter().copied().chain(std::iter::once(anchor)).collect();
    simplify_chain(&closed, 0, split, epsilon, &mut keep);
    simplify_chain(&closed, split, points.len(), epsilon, &mut keep);

    points
        .iter()
        .zip(&keep)
        .filter_map(|(p, &k)| k.then_some(*p))
        .collect()
}

fn simplify_chain(points: &[Point], start: usize, end: usize, epsilon: f64, keep: &mut [bool]) {
    let mut stack = vec![(start, end)];
    while let Some((a, b)) = stack.pop() {
        if b <= a + 1 {
            continue;
        }
        let (pa, pb) = (points[a], points[b]);
        let (far, dist) = ((a + 1)..b)
            .map(|i| (i, segment_distance(points[i], pa, pb)))
            .fold((a, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best });
        if dist > epsilon {
            keep[far] = true;
            stack.push((a, far));
            stack.push((far, b));
        }
    }
}

/// Distance from `p` to the line through `a` and `b` (to `a` when they coincide).
fn segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    let len = dx.hypot(dy);
    if len == 0.0 {
        return dist_sq(p, a).sqrt();
    }
    (((p.y - a.y) as f64) * dx - ((p.x - a.x) as f64) * dy).abs() / len
}

fn dist_sq(a: Point, b: Point) -> f64 {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    dx * dx + dy * dy
}

/// Smallest rectangle containing every point, with inclusive pixel extents.
///
/// A single point yields a `1 × 1` rectangle; no points yield an empty one.
pub fn bounding_rect(points: &[Point]) -> Rect {
    let Some(first) = points.first() else {
        return Rect::default();
    };
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    Rect::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1)
}
