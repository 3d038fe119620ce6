//! Generic `FrameSource` trait for depth-sensing hardware.

use stepgrid_types::{FrameSnapshot, StepGridError};

/// A depth sensor, optionally paired with a color camera.
///
/// Drivers are owned by the producer thread, which calls
/// [`capture`][Self::capture] once per physical frame and publishes the result.
pub trait FrameSource: Send {
    /// Stable identifier for this sensor, e.g. `"kinect_floor"`.
    fn id(&self) -> &str;

    /// `(width, height)` of every depth frame this source delivers.
    fn dimensions(&self) -> (u32, u32);

    /// Block until the next frame is available and return it.
    ///
    /// # Errors
    ///
    /// Returns [`StepGridError::SensorFault`] if the frame cannot be captured
    /// (e.g. the device is disconnected or the buffer is unavailable).
    fn capture(&mut self) -> Result<FrameSnapshot, StepGridError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepgrid_types::DepthFrame;

    struct MockSensor {
        id: String,
        sequence: u64,
        unplugged: bool,
    }

    impl FrameSource for MockSensor {
        fn id(&self) -> &str {
            &self.id
        }

        fn dimensions(&self) -> (u32, u32) {
            (2, 2)
        }

        fn capture(&mut self) -> Result<FrameSnapshot, StepGridError> {
            if self.unplugged {
                return Err(StepGridError::SensorFault {
                    sensor: self.id.clone(),
                    details: "device unplugged".to_string(),
                });
            }
            self.sequence += 1;
            Ok(FrameSnapshot::depth_only(
                self.sequence,
                DepthFrame::filled(2, 2, 900),
            ))
        }
    }

    #[test]
    fn mock_sensor_capture() {
        let mut sensor = MockSensor {
            id: "floor".to_string(),
            sequence: 0,
            unplugged: false,
        };
        assert_eq!(sensor.id(), "floor");
        let snapshot = sensor.capture().unwrap();
        assert_eq!(snapshot.sequence, 1);
        assert_eq!(snapshot.depth.pixel_count(), 4);
        assert!(snapshot.color.is_none());
    }

    #[test]
    fn mock_sensor_fault_names_sensor() {
        let mut sensor = MockSensor {
            id: "floor".to_string(),
            sequence: 0,
            unplugged: true,
        };
        let err = sensor.capture().unwrap_err();
        assert!(matches!(err, StepGridError::SensorFault { ref sensor, .. } if sensor == "floor"));
    }
}
