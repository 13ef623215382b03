//! Testing utilities for CrabFocus
//!
//! Synthetic frames with known sharpness properties, plus a simulated
//! focus stage and camera for running the full routine without hardware.

pub mod simulated;
pub mod synthetic_data;

pub use simulated::{SimulatedCamera, SimulatedMicroscope, SimulatedStage};
pub use synthetic_data::{checkerboard_frame, flat_frame, gaussian_blur, step_edge_frame};
