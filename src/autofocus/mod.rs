pub mod properties;
/// Two-Phase Autofocus Module
///
/// Finds best focus by sweeping a motorized axis:
/// 1. Coarse sweep centered on the current position
/// 2. Fine sweep centered on the coarse best
/// 3. Each step moves, settles, captures and scores a frame
/// 4. A sweep ends early once the score falls far enough below its best
///
/// [`routine::AutofocusRoutine`] wraps the search with the shutter,
/// exposure and channel bookkeeping a host expects.
pub mod routine;
pub mod search;

pub use properties::PropertyItem;
pub use routine::{AutofocusRoutine, ROUTINE_NAME};
pub use search::{run_search, run_search_with_report, SearchReport, SearchState, StepOutcome};

use crate::errors::HardwareError;
use crate::quality::{ScoreError, ScoringMethod};
use crate::types::SearchPhase;

/// Upper bound on steps per side of a sweep
pub const MAX_STEPS: u32 = 10_000;

/// What to do when a sweep never sees a positive score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoFocusPolicy {
    /// Return [`AutofocusError::NoFocusFound`]
    #[default]
    Fail,
    /// Move back to the starting position and report it as the result
    ReturnToStart,
}

/// Autofocus configuration
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AutofocusConfig {
    /// Coarse step size in axis units
    pub coarse_step_size: f64,

    /// Coarse steps on each side of the start position
    pub coarse_steps: u32,

    /// Fine step size in axis units
    pub fine_step_size: f64,

    /// Fine steps on each side of the coarse best
    pub fine_steps: u32,

    /// Relative drop below the running best that ends a sweep early
    pub threshold: f64,

    /// Fraction of width/height scored, centered (0.0-1.0]
    pub crop_fraction: f64,

    /// Exposure used during the search (ms); `None` keeps the current one
    pub exposure_ms: Option<f64>,

    /// Quantity to maximize
    pub scoring_method: ScoringMethod,

    /// Channel preset selected before the search
    pub channel: Option<String>,

    pub no_focus_policy: NoFocusPolicy,
}

impl Default for AutofocusConfig {
    fn default() -> Self {
        Self {
            coarse_step_size: 2.0,
            coarse_steps: 1,
            fine_step_size: 0.2,
            fine_steps: 5,
            threshold: 0.02,
            crop_fraction: 0.2,
            exposure_ms: Some(500.0),
            scoring_method: ScoringMethod::Edges,
            channel: None,
            no_focus_policy: NoFocusPolicy::Fail,
        }
    }
}

impl AutofocusConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), AutofocusError> {
        if self.coarse_steps == 0 {
            return Err(AutofocusError::InvalidConfiguration(
                "coarse_steps must be at least 1".to_string(),
            ));
        }
        if self.fine_steps == 0 {
            return Err(AutofocusError::InvalidConfiguration(
                "fine_steps must be at least 1".to_string(),
            ));
        }
        if self.coarse_steps > MAX_STEPS {
            return Err(AutofocusError::InvalidConfiguration(format!(
                "coarse_steps must be at most {}, got {}",
                MAX_STEPS, self.coarse_steps
            )));
        }
        if self.fine_steps > MAX_STEPS {
            return Err(AutofocusError::InvalidConfiguration(format!(
                "fine_steps must be at most {}, got {}",
                MAX_STEPS, self.fine_steps
            )));
        }
        if !(self.coarse_step_size.is_finite() && self.coarse_step_size > 0.0) {
            return Err(AutofocusError::InvalidConfiguration(format!(
                "coarse_step_size must be positive, got {}",
                self.coarse_step_size
            )));
        }
        if !(self.fine_step_size.is_finite() && self.fine_step_size > 0.0) {
            return Err(AutofocusError::InvalidConfiguration(format!(
                "fine_step_size must be positive, got {}",
                self.fine_step_size
            )));
        }
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(AutofocusError::InvalidConfiguration(format!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        crate::quality::crop::validate_crop_fraction(self.crop_fraction)?;
        if let Some(exposure) = self.exposure_ms {
            if !(exposure.is_finite() && exposure > 0.0) {
                return Err(AutofocusError::InvalidConfiguration(format!(
                    "exposure_ms must be positive, got {}",
                    exposure
                )));
            }
        }
        if matches!(&self.channel, Some(c) if c.trim().is_empty()) {
            return Err(AutofocusError::InvalidConfiguration(
                "channel must not be blank; omit it instead".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of positions a sweep visits at most
    pub fn coarse_positions(&self) -> u64 {
        2 * u64::from(self.coarse_steps) + 1
    }

    pub fn fine_positions(&self) -> u64 {
        2 * u64::from(self.fine_steps) + 1
    }
}

/// Autofocus error types
#[derive(Debug, thiserror::Error)]
pub enum AutofocusError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Hardware failure: {0}")]
    HardwareFailure(#[from] HardwareError),

    #[error("No focus found: score never rose above zero during the {phase} sweep")]
    NoFocusFound { phase: SearchPhase },

    #[error("An autofocus routine is already running")]
    AlreadyRunning,

    #[error("Autofocus lock poisoned by previous panic")]
    PoisonedLock,
}

impl From<ScoreError> for AutofocusError {
    fn from(err: ScoreError) -> Self {
        AutofocusError::InvalidConfiguration(err.to_string())
    }
}
