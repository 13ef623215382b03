/// Focus quality scoring
///
/// Turns a captured frame into a single sharpness number. Higher means
/// more high-frequency content, which for a fixed scene means better focus.
pub mod crop;
pub mod sharpness;

pub use crop::CropRegion;
pub use sharpness::{score, score_with, FocusScorer, ScoringMethod, SharpnessScorer};

/// Scoring input errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoreError {
    #[error("crop fraction must be in (0, 1], got {0}")]
    InvalidCropFraction(f64),
}
