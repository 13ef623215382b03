//! Capability traits for the hardware an autofocus routine drives.
//!
//! The focus search only ever talks to these two traits. Real drivers,
//! host bridges and the simulator in [`crate::testing`] all sit behind
//! them.

use crate::errors::HardwareError;
use crate::types::Frame;

/// A motorized degree of freedom swept by the search, usually a Z stage.
pub trait FocusAxis {
    /// Position as reported by the device
    fn current_position(&mut self) -> Result<f64, HardwareError>;

    /// Start a move to `position`. The move may still be in progress on return.
    fn move_to(&mut self, position: f64) -> Result<(), HardwareError>;

    /// Block until the last move has physically completed
    fn wait_until_settled(&mut self) -> Result<(), HardwareError>;
}

/// A camera-like device that produces frames.
pub trait FrameSource {
    /// Exposure time in milliseconds
    fn exposure(&self) -> Result<f64, HardwareError>;

    fn set_exposure(&mut self, exposure_ms: f64) -> Result<(), HardwareError>;

    /// Expose and return one frame
    fn capture(&mut self) -> Result<Frame, HardwareError>;

    fn shutter_open(&self) -> Result<bool, HardwareError>;

    fn set_shutter_open(&mut self, open: bool) -> Result<(), HardwareError>;

    fn auto_shutter(&self) -> Result<bool, HardwareError>;

    fn set_auto_shutter(&mut self, enabled: bool) -> Result<(), HardwareError>;

    /// Channel presets the device knows about
    fn available_channels(&self) -> Vec<String> {
        Vec::new()
    }

    /// Switch to a named channel preset and wait for the system to settle.
    fn select_channel(&mut self, channel: &str) -> Result<(), HardwareError> {
        Err(HardwareError::Unsupported(format!(
            "channel selection not available (requested '{}')",
            channel
        )))
    }
}

impl<T: FocusAxis + ?Sized> FocusAxis for &mut T {
    fn current_position(&mut self) -> Result<f64, HardwareError> {
        (**self).current_position()
    }

    fn move_to(&mut self, position: f64) -> Result<(), HardwareError> {
        (**self).move_to(position)
    }

    fn wait_until_settled(&mut self) -> Result<(), HardwareError> {
        (**self).wait_until_settled()
    }
}

impl<T: FrameSource + ?Sized> FrameSource for &mut T {
    fn exposure(&self) -> Result<f64, HardwareError> {
        (**self).exposure()
    }

    fn set_exposure(&mut self, exposure_ms: f64) -> Result<(), HardwareError> {
        (**self).set_exposure(exposure_ms)
    }

    fn capture(&mut self) -> Result<Frame, HardwareError> {
        (**self).capture()
    }

    fn shutter_open(&self) -> Result<bool, HardwareError> {
        (**self).shutter_open()
    }

    fn set_shutter_open(&mut self, open: bool) -> Result<(), HardwareError> {
        (**self).set_shutter_open(open)
    }

    fn auto_shutter(&self) -> Result<bool, HardwareError> {
        (**self).auto_shutter()
    }

    fn set_auto_shutter(&mut self, enabled: bool) -> Result<(), HardwareError> {
        (**self).set_auto_shutter(enabled)
    }

    fn available_channels(&self) -> Vec<String> {
        (**self).available_channels()
    }

    fn select_channel(&mut self, channel: &str) -> Result<(), HardwareError> {
        (**self).select_channel(channel)
    }
}
