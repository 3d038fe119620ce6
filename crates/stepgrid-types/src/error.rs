use thiserror::Error;

/// Global error type spanning sensor faults, frame validation and configuration.
///
/// Degenerate configuration (zero-sized grid, empty depth or threshold band)
/// is deliberately absent: the pipeline absorbs it as an empty result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepGridError {
    #[error("Frame Dimension Mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    FrameDimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    #[error("Buffer Length Mismatch: expected {expected} samples, got {actual}")]
    BufferLength { expected: usize, actual: usize },

    #[error("Sensor Fault on {sensor}: {details}")]
    SensorFault { sensor: String, details: String },

    #[error("Worker Spawn Failed: {0}")]
    WorkerSpawn(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Channel Error: {0}")]
    Channel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mismatch_display_names_both_sizes() {
        let err = StepGridError::FrameDimensionMismatch {
            expected_width: 640,
            expected_height: 480,
            width: 320,
            height: 240,
        };
        let text = err.to_string();
        assert!(text.contains("640x480"));
        assert!(text.contains("320x240"));
    }

    #[test]
    fn sensor_fault_display_names_sensor() {
        let err = StepGridError::SensorFault {
            sensor: "kinect".to_string(),
            details: "usb reset".to_string(),
        };
        assert!(err.to_string().contains("kinect"));
    }
}
