use std::fmt;

/// Failures reported by focus-axis and frame-source collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum HardwareError {
    MoveError(String),
    SettleError(String),
    CaptureError(String),
    ControlError(String),
    Unsupported(String),
}

impl fmt::Display for HardwareError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HardwareError::MoveError(msg) => write!(f, "Axis move error: {}", msg),
            HardwareError::SettleError(msg) => write!(f, "Axis settle error: {}", msg),
            HardwareError::CaptureError(msg) => write!(f, "Capture error: {}", msg),
            HardwareError::ControlError(msg) => write!(f, "Camera control error: {}", msg),
            HardwareError::Unsupported(msg) => write!(f, "Unsupported operation: {}", msg),
        }
    }
}

impl std::error::Error for HardwareError {}
