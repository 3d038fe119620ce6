//! Synthetic depth sensor for running the detector without hardware.
//!
//! [`SimDepthSensor`] renders a flat background plane and, optionally, one
//! rectangular target (a "dancer") that sweeps back and forth across the
//! frame at a fixed depth.  With the default settings the background lies
//! outside the depth band and the target inside it, so the target shows up
//! as a single blob travelling across the tile grid.
//!
//! # Example
//!
//! ```rust
//! use stepgrid_hal::{FrameSource, SimDepthSensor, SimTarget};
//!
//! let mut sensor = SimDepthSensor::new("sim_floor", 200, 150)
//!     .with_target(SimTarget::default())
//!     .with_color();
//!
//! let snapshot = sensor.capture().expect("sim capture must succeed");
//! assert_eq!(snapshot.depth.width, 200);
//! assert!(snapshot.color.is_some());
//! ```

use serde::{Deserialize, Serialize};
use stepgrid_types::{ColorFrame, DepthFrame, FrameSnapshot, Rect, StepGridError};
use tracing::trace;

use crate::source::FrameSource;

/// Depth of the background plane when none is configured, in sensor units.
pub const DEFAULT_BACKGROUND_DEPTH: u16 = 3000;

const BACKGROUND_RGB: [u8; 3] = [40, 40, 40];
const TARGET_RGB: [u8; 3] = [200, 60, 60];

/// The moving rectangle rendered by [`SimDepthSensor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimTarget {
    pub width: u32,
    pub height: u32,
    /// Depth of every target pixel.
    pub depth: u16,
    /// Horizontal travel per captured frame, in pixels.
    pub speed: u32,
}

impl Default for SimTarget {
    fn default() -> Self {
        Self {
            width: 30,
            height: 30,
            depth: 1000,
            speed: 4,
        }
    }
}

/// A simulated depth sensor.  Always succeeds.
pub struct SimDepthSensor {
    id: String,
    width: u32,
    height: u32,
    background: u16,
    target: Option<SimTarget>,
    color: bool,
    sequence: u64,
}

impl SimDepthSensor {
    /// A sensor that sees only the background plane.
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            background: DEFAULT_BACKGROUND_DEPTH,
            target: None,
            color: false,
            sequence: 0,
        }
    }

    /// Set the background depth.  `0` simulates a sensor with no returns.
    pub fn with_background(mut self, depth: u16) -> Self {
        self.background = depth;
        self
    }

    /// Add a moving target.
    pub fn with_target(mut self, target: SimTarget) -> Self {
        self.target = Some(target);
        self
    }

    /// Also deliver a color frame with every depth frame.
    pub fn with_color(mut self) -> Self {
        self.color = true;
        self
    }

    /// Where the target will be drawn in the next captured frame.
    pub fn target_rect(&self) -> Option<Rect> {
        self.target.map(|t| self.rect_at(t, self.sequence))
    }

    fn rect_at(&self, target: SimTarget, tick: u64) -> Rect {
        let travel = self.width.saturating_sub(target.width) as u64;
        let x = if travel == 0 {
            0
        } else {
            let period = travel * 2;
            let p = (tick * target.speed as u64) % period;
            if p <= travel { p } else { period - p }
        };
        let y = self.height.saturating_sub(target.height) / 2;
        Rect::new(
            x as i32,
            y as i32,
            target.width.min(self.width) as i32,
            target.height.min(self.height) as i32,
        )
    }

    fn render(&self, rect: Option<Rect>) -> (DepthFrame, Option<ColorFrame>) {
        let mut depth = DepthFrame::filled(self.width, self.height, self.background);
        let mut rgb = self
            .color
            .then(|| BACKGROUND_RGB.repeat(depth.pixel_count()));

        if let (Some(rect), Some(target)) = (rect, self.target) {
            for y in rect.y..rect.bottom() {
                for x in rect.x..rect.right() {
                    let i = y as usize * self.width as usize + x as usize;
                    depth.data[i] = target.depth;
                    if let Some(rgb) = rgb.as_mut() {
                        rgb[i * 3..i * 3 + 3].copy_from_slice(&TARGET_RGB);
                    }
                }
            }
        }

        let color = rgb.map(|data| ColorFrame {
            width: self.width,
            height: self.height,
            data,
        });
        (depth, color)
    }
}

impl FrameSource for SimDepthSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn capture(&mut self) -> Result<FrameSnapshot, StepGridError> {
        let rect = self.target_rect();
        let (depth, color) = self.render(rect);
        self.sequence += 1;
        trace!(sensor = %self.id, sequence = self.sequence, ?rect, "sim frame captured");
        Ok(FrameSnapshot {
            sequence: self.sequence,
            depth,
            color,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_only_frame_is_flat() {
        let mut sensor = SimDepthSensor::new("sim", 8, 6).with_background(2500);
        let snapshot = sensor.capture().unwrap();
        assert!(snapshot.depth.data.iter().all(|&d| d == 2500));
        assert!(snapshot.color.is_none());
        assert!(snapshot.depth.validate().is_ok());
    }

    #[test]
    fn target_is_drawn_at_its_depth() {
        let target = SimTarget {
            width: 4,
            height: 2,
            depth: 900,
            speed: 0,
        };
        let mut sensor = SimDepthSensor::new("sim", 10, 6).with_target(target);
        let snapshot = sensor.capture().unwrap();
        assert_eq!(snapshot.depth.get(0, 2), Some(900));
        assert_eq!(snapshot.depth.get(3, 3), Some(900));
        assert_eq!(snapshot.depth.get(4, 2), Some(DEFAULT_BACKGROUND_DEPTH));
        assert_eq!(snapshot.depth.get(0, 1), Some(DEFAULT_BACKGROUND_DEPTH));
    }

    #[test]
    fn target_bounces_between_edges() {
        let target = SimTarget {
            width: 10,
            height: 10,
            depth: 1000,
            speed: 5,
        };
        let mut sensor = SimDepthSensor::new("sim", 30, 20).with_target(target);
        let mut xs = Vec::new();
        for _ in 0..9 {
            xs.push(sensor.target_rect().unwrap().x);
            sensor.capture().unwrap();
        }
        assert_eq!(xs, vec![0, 5, 10, 15, 20, 15, 10, 5, 0]);
    }

    #[test]
    fn sequence_increments_per_capture() {
        let mut sensor = SimDepthSensor::new("sim", 4, 4);
        assert_eq!(sensor.capture().unwrap().sequence, 1);
        assert_eq!(sensor.capture().unwrap().sequence, 2);
    }

    #[test]
    fn color_frame_marks_target() {
        let target = SimTarget {
            width: 2,
            height: 2,
            depth: 1000,
            speed: 0,
        };
        let mut sensor = SimDepthSensor::new("sim", 4, 4).with_target(target).with_color();
        let color = sensor.capture().unwrap().color.unwrap();
        assert!(color.matches(4, 4));
        let px = |x: usize, y: usize| &color.data[(y * 4 + x) * 3..(y * 4 + x) * 3 + 3];
        assert_eq!(px(0, 1), &TARGET_RGB);
        assert_eq!(px(3, 3), &BACKGROUND_RGB);
    }

    #[test]
    fn oversized_target_is_clamped_to_frame() {
        let target = SimTarget {
            width: 50,
            height: 50,
            depth: 800,
            speed: 3,
        };
        let mut sensor = SimDepthSensor::new("sim", 8, 8).with_target(target);
        let snapshot = sensor.capture().unwrap();
        assert!(snapshot.depth.data.iter().all(|&d| d == 800));
    }
}
