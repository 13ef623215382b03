//! Simulated focus stage and camera
//!
//! Both halves share one [`SimulatedMicroscope`] state, so a test can keep
//! a handle and inspect what the autofocus routine did to the "hardware".
//! Frames show a checkerboard target blurred in proportion to the distance
//! between the stage and the focal plane.

use super::synthetic_data::{checkerboard_frame, flat_frame, gaussian_blur};
use crate::config::SimulationConfig;
use crate::errors::HardwareError;
use crate::hardware::{FocusAxis, FrameSource};
use crate::types::Frame;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const DEFAULT_EXPOSURE_MS: f64 = 10.0;

#[derive(Debug, Clone)]
struct ScopeState {
    focal_plane: f64,
    commanded: f64,
    position: f64,
    exposure_ms: f64,
    shutter_open: bool,
    auto_shutter: bool,
    channel: Option<String>,
    frames_captured: usize,
    moves: Vec<f64>,
    capture_exposures: Vec<f64>,
    fail_capture_after: Option<usize>,
    fail_moves: bool,
    fail_controls: bool,
}

/// Shared state behind a simulated stage/camera pair.
#[derive(Debug, Clone)]
pub struct SimulatedMicroscope {
    state: Arc<Mutex<ScopeState>>,
    config: Arc<SimulationConfig>,
    target: Arc<Frame>,
}

impl SimulatedMicroscope {
    pub fn new(config: SimulationConfig) -> Self {
        let [width, height] = config.frame_size;
        let (low, high) = if config.sixteen_bit {
            (2_000, 50_000)
        } else {
            (30, 220)
        };
        let target = checkerboard_frame(width, height, config.pattern_period, low, high);

        log::debug!(
            "Simulated microscope: {}x{} target, focal plane {:.3}, start {:.3}",
            width,
            height,
            config.focal_plane,
            config.start_position
        );

        Self {
            state: Arc::new(Mutex::new(ScopeState {
                focal_plane: config.focal_plane,
                commanded: config.start_position,
                position: config.start_position,
                exposure_ms: DEFAULT_EXPOSURE_MS,
                shutter_open: false,
                auto_shutter: true,
                channel: None,
                frames_captured: 0,
                moves: Vec::new(),
                capture_exposures: Vec::new(),
                fail_capture_after: None,
                fail_moves: false,
                fail_controls: false,
            })),
            config: Arc::new(config),
            target: Arc::new(target),
        }
    }

    pub fn stage(&self) -> SimulatedStage {
        SimulatedStage {
            scope: self.clone(),
        }
    }

    pub fn camera(&self) -> SimulatedCamera {
        SimulatedCamera {
            scope: self.clone(),
        }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, ScopeState> {
        // Plain data; a panicking test thread cannot leave it half-updated.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Settled stage position
    pub fn position(&self) -> f64 {
        self.lock().position
    }

    pub fn focal_plane(&self) -> f64 {
        self.lock().focal_plane
    }

    pub fn set_focal_plane(&self, focal_plane: f64) {
        self.lock().focal_plane = focal_plane;
    }

    /// Every commanded move, in order
    pub fn moves(&self) -> Vec<f64> {
        self.lock().moves.clone()
    }

    pub fn frames_captured(&self) -> usize {
        self.lock().frames_captured
    }

    /// Exposure in effect for each captured frame
    pub fn capture_exposures(&self) -> Vec<f64> {
        self.lock().capture_exposures.clone()
    }

    pub fn exposure(&self) -> f64 {
        self.lock().exposure_ms
    }

    pub fn shutter_open(&self) -> bool {
        self.lock().shutter_open
    }

    pub fn auto_shutter(&self) -> bool {
        self.lock().auto_shutter
    }

    pub fn channel(&self) -> Option<String> {
        self.lock().channel.clone()
    }

    /// Set the camera state a routine will find before it starts
    pub fn set_camera_state(&self, shutter_open: bool, auto_shutter: bool, exposure_ms: f64) {
        let mut state = self.lock();
        state.shutter_open = shutter_open;
        state.auto_shutter = auto_shutter;
        state.exposure_ms = exposure_ms;
    }

    /// Fail every capture once `frames` frames have been delivered
    pub fn fail_capture_after(&self, frames: Option<usize>) {
        self.lock().fail_capture_after = frames;
    }

    pub fn fail_moves(&self, fail: bool) {
        self.lock().fail_moves = fail;
    }

    /// Fail shutter, auto-shutter and exposure setters
    pub fn fail_controls(&self, fail: bool) {
        self.lock().fail_controls = fail;
    }

    /// Render what the camera sees with the stage at `position`
    pub fn render_at(&self, position: f64) -> Frame {
        let focal_plane = self.focal_plane();
        let sigma = ((position - focal_plane).abs() * self.config.blur_per_unit)
            .min(self.config.max_blur_sigma);
        gaussian_blur(&self.target, sigma)
    }

    fn check_controls(&self, control: &str) -> Result<(), HardwareError> {
        if self.lock().fail_controls {
            return Err(HardwareError::ControlError(format!(
                "simulated {} failure",
                control
            )));
        }
        Ok(())
    }
}

/// Focus axis half of a [`SimulatedMicroscope`].
#[derive(Debug, Clone)]
pub struct SimulatedStage {
    scope: SimulatedMicroscope,
}

impl FocusAxis for SimulatedStage {
    fn current_position(&mut self) -> Result<f64, HardwareError> {
        Ok(self.scope.lock().position)
    }

    fn move_to(&mut self, position: f64) -> Result<(), HardwareError> {
        let mut state = self.scope.lock();
        if state.fail_moves {
            return Err(HardwareError::MoveError(format!(
                "simulated stage refused move to {:.4}",
                position
            )));
        }
        if !position.is_finite() {
            return Err(HardwareError::MoveError(format!(
                "invalid target position {}",
                position
            )));
        }
        state.commanded = position;
        state.moves.push(position);
        Ok(())
    }

    fn wait_until_settled(&mut self) -> Result<(), HardwareError> {
        let mut state = self.scope.lock();
        state.position = state.commanded;
        Ok(())
    }
}

/// Camera half of a [`SimulatedMicroscope`].
#[derive(Debug, Clone)]
pub struct SimulatedCamera {
    scope: SimulatedMicroscope,
}

impl FrameSource for SimulatedCamera {
    fn exposure(&self) -> Result<f64, HardwareError> {
        Ok(self.scope.exposure())
    }

    fn set_exposure(&mut self, exposure_ms: f64) -> Result<(), HardwareError> {
        self.scope.check_controls("exposure")?;
        if !(exposure_ms.is_finite() && exposure_ms > 0.0) {
            return Err(HardwareError::ControlError(format!(
                "invalid exposure {}",
                exposure_ms
            )));
        }
        self.scope.lock().exposure_ms = exposure_ms;
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, HardwareError> {
        let (position, lit) = {
            let mut state = self.scope.lock();
            if let Some(limit) = state.fail_capture_after {
                if state.frames_captured >= limit {
                    return Err(HardwareError::CaptureError(format!(
                        "simulated camera failure after {} frames",
                        limit
                    )));
                }
            }
            state.frames_captured += 1;
            let exposure = state.exposure_ms;
            state.capture_exposures.push(exposure);
            (state.position, state.shutter_open || state.auto_shutter)
        };

        if lit {
            Ok(self.scope.render_at(position))
        } else {
            let [width, height] = self.scope.config.frame_size;
            Ok(flat_frame(width, height, 0))
        }
    }

    fn shutter_open(&self) -> Result<bool, HardwareError> {
        Ok(self.scope.shutter_open())
    }

    fn set_shutter_open(&mut self, open: bool) -> Result<(), HardwareError> {
        self.scope.check_controls("shutter")?;
        self.scope.lock().shutter_open = open;
        Ok(())
    }

    fn auto_shutter(&self) -> Result<bool, HardwareError> {
        Ok(self.scope.auto_shutter())
    }

    fn set_auto_shutter(&mut self, enabled: bool) -> Result<(), HardwareError> {
        self.scope.check_controls("auto-shutter")?;
        self.scope.lock().auto_shutter = enabled;
        Ok(())
    }

    fn available_channels(&self) -> Vec<String> {
        self.scope.config.channels.clone()
    }

    fn select_channel(&mut self, channel: &str) -> Result<(), HardwareError> {
        if !self.scope.config.channels.iter().any(|c| c == channel) {
            return Err(HardwareError::ControlError(format!(
                "unknown channel '{}'",
                channel
            )));
        }
        self.scope.lock().channel = Some(channel.to_string());
        Ok(())
    }
}
