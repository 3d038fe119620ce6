//! Raw sensor buffers and the per-cycle snapshot handed to the detector.

use crate::error::StepGridError;
use crate::settings::PixelFormat;

// ────────────────────────────────────────────────────────────────────────────
// DepthFrame
// ────────────────────────────────────────────────────────────────────────────

/// A single depth image as delivered by the sensor driver.
///
/// Samples are row-major, one `u16` per pixel.  A sample of `0` means the
/// sensor received no return for that pixel and is never treated as valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Raw depth samples, `width * height` entries.
    pub data: Vec<u16>,
}

impl DepthFrame {
    /// Build a frame, checking that `data` holds exactly `width * height` samples.
    ///
    /// # Errors
    ///
    /// Returns [`StepGridError::BufferLength`] when the sample count is wrong.
    pub fn new(width: u32, height: u32, data: Vec<u16>) -> Result<Self, StepGridError> {
        let frame = Self {
            width,
            height,
            data,
        };
        frame.validate()?;
        Ok(frame)
    }

    /// A frame where every sample is `0` (no return).
    pub fn blank(width: u32, height: u32) -> Self {
        Self::filled(width, height, 0)
    }

    /// A frame where every sample has the same depth.
    pub fn filled(width: u32, height: u32, depth: u16) -> Self {
        Self {
            width,
            height,
            data: vec![depth; pixel_count(width, height)],
        }
    }

    /// Number of pixels implied by the frame dimensions.
    pub fn pixel_count(&self) -> usize {
        pixel_count(self.width, self.height)
    }

    /// Sample at `(x, y)`, or `None` outside the frame.
    pub fn get(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get((y * self.width + x) as usize).copied()
    }

    /// Check that the buffer length matches the declared dimensions.
    pub fn validate(&self) -> Result<(), StepGridError> {
        let expected = self.pixel_count();
        if self.data.len() != expected {
            return Err(StepGridError::BufferLength {
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ColorFrame
// ────────────────────────────────────────────────────────────────────────────

/// A packed RGB24 color image captured on the same cadence as the depth frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorFrame {
    pub width: u32,
    pub height: u32,
    /// Packed `R, G, B` bytes, `width * height * 3` entries.
    pub data: Vec<u8>,
}

impl ColorFrame {
    /// Build a color frame, checking that `data` holds `width * height * 3` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StepGridError::BufferLength`] when the byte count is wrong.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, StepGridError> {
        let expected = pixel_count(width, height) * 3;
        if data.len() != expected {
            return Err(StepGridError::BufferLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// True when this frame can be blended with an image of the given size.
    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.width == width
            && self.height == height
            && self.data.len() == pixel_count(width, height) * 3
    }
}

// ────────────────────────────────────────────────────────────────────────────
// FrameSnapshot
// ────────────────────────────────────────────────────────────────────────────

/// Everything the sensor delivered for one physical frame.
///
/// Snapshots are immutable once published; the producer hands them over
/// behind an `Arc` and the detector reads one per cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSnapshot {
    /// Monotonic frame number assigned by the producer.
    pub sequence: u64,
    pub depth: DepthFrame,
    /// Present only for sensors with a color camera.
    pub color: Option<ColorFrame>,
}

impl FrameSnapshot {
    /// Snapshot carrying a depth frame only.
    pub fn depth_only(sequence: u64, depth: DepthFrame) -> Self {
        Self {
            sequence,
            depth,
            color: None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// DiagnosticImage
// ────────────────────────────────────────────────────────────────────────────

/// A packed four-channel image rendered from one pipeline stage.
///
/// Ownership moves to whoever receives it from the detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticImage {
    pub width: u32,
    pub height: u32,
    /// Channel order of `data`.
    pub format: PixelFormat,
    /// `width * height * 4` bytes.
    pub data: Vec<u8>,
}

impl DiagnosticImage {
    /// Byte size a diagnostic buffer of the given dimensions must have.
    pub fn expected_len(width: u32, height: u32) -> usize {
        pixel_count(width, height) * 4
    }
}

fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_frame_rejects_short_buffer() {
        let err = DepthFrame::new(4, 4, vec![0; 15]).unwrap_err();
        assert_eq!(
            err,
            StepGridError::BufferLength {
                expected: 16,
                actual: 15
            }
        );
    }

    #[test]
    fn depth_frame_get_is_row_major() {
        let frame = DepthFrame::new(3, 2, vec![1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(frame.get(0, 0), Some(1));
        assert_eq!(frame.get(2, 0), Some(3));
        assert_eq!(frame.get(0, 1), Some(4));
        assert_eq!(frame.get(3, 0), None);
    }

    #[test]
    fn color_frame_checks_rgb_length() {
        assert!(ColorFrame::new(2, 2, vec![0; 12]).is_ok());
        assert!(ColorFrame::new(2, 2, vec![0; 16]).is_err());
    }

    #[test]
    fn color_frame_matches_only_same_size() {
        let color = ColorFrame::new(2, 2, vec![0; 12]).unwrap();
        assert!(color.matches(2, 2));
        assert!(!color.matches(4, 2));
    }
}
