//! CrabFocus: image-sharpness autofocus for motorized focus stages
//!
//! This crate finds best focus by sweeping a focus axis in two phases,
//! coarse then fine, and scoring a centered crop of each captured frame.
//!
//! # Features
//! - Median-filtered edge-energy and standard-deviation focus metrics
//! - Two-phase search with relative-drop early exit
//! - Host-facing routine with shutter/exposure save-and-restore
//! - Named string properties for host configuration dialogs
//! - TOML configuration with environment overrides
//! - Simulated stage and camera for offline testing
//!
//! # Usage
//! ```rust,ignore
//! use crabfocus::autofocus::{AutofocusConfig, AutofocusRoutine};
//!
//! let routine = AutofocusRoutine::new(my_stage, my_camera, AutofocusConfig::default());
//! let best = routine.full_focus()?;
//! ```
pub mod autofocus;
pub mod config;
pub mod errors;
pub mod hardware;
pub mod invariant_ppt;
pub mod quality;
pub mod types;

// Testing utilities - simulated hardware for offline testing
pub mod testing;

// Re-exports for convenience
pub use autofocus::{
    run_search, run_search_with_report, AutofocusConfig, AutofocusError, AutofocusRoutine,
    NoFocusPolicy, SearchReport,
};
pub use errors::HardwareError;
pub use hardware::{FocusAxis, FrameSource};
pub use quality::{FocusScorer, ScoringMethod, SharpnessScorer};
pub use types::{Frame, PixelData, ScoreSample, SearchPhase};

/// Initialize logging for the autofocus system
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "crabfocus=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        routine: autofocus::ROUTINE_NAME.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub routine: String,
}
