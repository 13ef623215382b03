//! Two-phase focus search
//!
//! Sequential scan: every step blocks on the axis and the camera before
//! scoring. Nothing is retried; the first hardware error ends the search.

use super::{AutofocusConfig, AutofocusError, NoFocusPolicy};
use crate::errors::HardwareError;
use crate::hardware::{FocusAxis, FrameSource};
use crate::quality::FocusScorer;
use crate::types::{ScoreSample, SearchPhase};
use std::time::Instant;
use uuid::Uuid;

/// Initial sample buffer size; long sweeps grow it on demand
const SAMPLE_CAPACITY: usize = 64;

/// What a sample did to the sweep it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// New running best
    Improved,
    /// Keep sweeping
    Continue,
    /// Score dropped more than `threshold` below the best; stop the sweep
    EarlyExit,
}

/// Per-sweep bookkeeping, created at the start of a phase and dropped at its end.
#[derive(Debug, Clone)]
pub struct SearchState {
    phase: SearchPhase,
    base: f64,
    step_size: f64,
    steps: u32,
    index: u64,
    best: Option<ScoreSample>,
}

impl SearchState {
    /// Sweep of `2 * steps + 1` positions centered on `center`
    pub fn new(phase: SearchPhase, center: f64, step_size: f64, steps: u32) -> Self {
        Self {
            phase,
            base: center - step_size * steps as f64,
            step_size,
            steps,
            index: 0,
            best: None,
        }
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn total_positions(&self) -> u64 {
        2 * u64::from(self.steps) + 1
    }

    pub fn step_index(&self) -> u64 {
        self.index
    }

    pub fn best(&self) -> Option<&ScoreSample> {
        self.best.as_ref()
    }

    /// Next commanded position, or `None` once the sweep is exhausted
    pub fn next_position(&mut self) -> Option<f64> {
        if self.index >= self.total_positions() {
            return None;
        }
        let position = self.base + self.index as f64 * self.step_size;
        self.index += 1;
        Some(position)
    }

    /// Fold a new sample into the running best.
    ///
    /// Only a positive score can become the first best. With a best
    /// present, a strictly higher score replaces it and a drop of more
    /// than `threshold * best` ends the sweep.
    pub fn observe(&mut self, sample: &ScoreSample, threshold: f64) -> StepOutcome {
        match &self.best {
            None if sample.score > 0.0 => {
                self.best = Some(sample.clone());
                StepOutcome::Improved
            }
            None => StepOutcome::Continue,
            Some(best) if sample.score > best.score => {
                self.best = Some(sample.clone());
                StepOutcome::Improved
            }
            Some(best) if best.score - sample.score > threshold * best.score => {
                StepOutcome::EarlyExit
            }
            Some(_) => StepOutcome::Continue,
        }
    }

    pub fn into_best(self) -> Option<ScoreSample> {
        self.best
    }
}

/// Everything observed during one search.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchReport {
    pub run_id: Uuid,
    pub start_position: f64,
    /// Final axis position
    pub best_position: f64,
    /// `false` when [`NoFocusPolicy::ReturnToStart`] kicked in
    pub focus_found: bool,
    pub coarse_best: Option<ScoreSample>,
    pub fine_best: Option<ScoreSample>,
    /// Every sample, in capture order
    pub samples: Vec<ScoreSample>,
    pub frames_captured: usize,
    pub elapsed_ms: u64,
}

impl SearchReport {
    pub fn samples_in(&self, phase: SearchPhase) -> impl Iterator<Item = &ScoreSample> {
        self.samples.iter().filter(move |s| s.phase == phase)
    }
}

/// Run the two-phase search and return the final axis position.
pub fn run_search<A, C, S>(
    axis: &mut A,
    capture: &mut C,
    scorer: &S,
    config: &AutofocusConfig,
) -> Result<f64, AutofocusError>
where
    A: FocusAxis + ?Sized,
    C: FrameSource + ?Sized,
    S: FocusScorer + ?Sized,
{
    run_search_with_report(axis, capture, scorer, config).map(|report| report.best_position)
}

/// Run the two-phase search and return the full report.
pub fn run_search_with_report<A, C, S>(
    axis: &mut A,
    capture: &mut C,
    scorer: &S,
    config: &AutofocusConfig,
) -> Result<SearchReport, AutofocusError>
where
    A: FocusAxis + ?Sized,
    C: FrameSource + ?Sized,
    S: FocusScorer + ?Sized,
{
    config.validate()?;

    let started = Instant::now();
    let run_id = Uuid::new_v4();
    let start_position = hardware(axis.current_position(), "read axis position")?;

    log::info!(
        "Autofocus {} started at {:.4}: coarse {} x {}, fine {} x {}, threshold {}",
        run_id,
        start_position,
        config.coarse_step_size,
        config.coarse_steps,
        config.fine_step_size,
        config.fine_steps,
        config.threshold
    );

    let mut sweep = Sweep {
        samples: Vec::with_capacity(SAMPLE_CAPACITY),
        dimensions: None,
        threshold: config.threshold,
    };

    let coarse = SearchState::new(
        SearchPhase::Coarse,
        start_position,
        config.coarse_step_size,
        config.coarse_steps,
    );
    let coarse_best = match sweep.run(axis, capture, scorer, coarse)? {
        Some(best) => best,
        None => {
            return no_focus(axis, config, SearchPhase::Coarse, start_position).map(|position| {
                sweep.into_report(run_id, start_position, position, None, None, started)
            });
        }
    };

    let fine = SearchState::new(
        SearchPhase::Fine,
        coarse_best.position,
        config.fine_step_size,
        config.fine_steps,
    );
    let fine_best = match sweep.run(axis, capture, scorer, fine)? {
        Some(best) => best,
        None => {
            return no_focus(axis, config, SearchPhase::Fine, start_position).map(|position| {
                let coarse_best = Some(coarse_best);
                sweep.into_report(run_id, start_position, position, coarse_best, None, started)
            });
        }
    };

    move_and_settle(axis, fine_best.position)?;

    log::info!(
        "Autofocus {} finished at {:.4} (score {:.3e}) after {} frames in {}ms",
        run_id,
        fine_best.position,
        fine_best.score,
        sweep.samples.len(),
        started.elapsed().as_millis()
    );

    let best_position = fine_best.position;
    Ok(sweep.into_report(
        run_id,
        start_position,
        best_position,
        Some(coarse_best),
        Some(fine_best),
        started,
    ))
}

struct Sweep {
    samples: Vec<ScoreSample>,
    dimensions: Option<(u32, u32)>,
    threshold: f64,
}

impl Sweep {
    fn run<A, C, S>(
        &mut self,
        axis: &mut A,
        capture: &mut C,
        scorer: &S,
        mut state: SearchState,
    ) -> Result<Option<ScoreSample>, AutofocusError>
    where
        A: FocusAxis + ?Sized,
        C: FrameSource + ?Sized,
        S: FocusScorer + ?Sized,
    {
        log::info!(
            "Starting {} sweep: {} positions",
            state.phase(),
            state.total_positions()
        );

        while let Some(target) = state.next_position() {
            move_and_settle(axis, target)?;
            let position = hardware(axis.current_position(), "read axis position")?;
            let frame = hardware(capture.capture(), "capture frame")?;

            let dims = frame.dimensions();
            match self.dimensions {
                None => self.dimensions = Some(dims),
                Some(expected) if expected != dims => {
                    log::error!(
                        "Frame size changed mid-search: expected {}x{}, got {}x{}",
                        expected.0,
                        expected.1,
                        dims.0,
                        dims.1
                    );
                    return Err(HardwareError::CaptureError(format!(
                        "frame size changed from {}x{} to {}x{}",
                        expected.0, expected.1, dims.0, dims.1
                    ))
                    .into());
                }
                Some(_) => {}
            }

            let sample = ScoreSample::new(position, scorer.score(&frame), state.phase());
            let outcome = state.observe(&sample, self.threshold);

            log::debug!(
                "{} step {}/{} at {:.4}: score {:.3e} ({:?})",
                state.phase(),
                state.step_index(),
                state.total_positions(),
                sample.position,
                sample.score,
                outcome
            );

            self.samples.push(sample);

            if outcome == StepOutcome::EarlyExit {
                log::info!(
                    "{} sweep stopped early after {} of {} positions",
                    state.phase(),
                    state.step_index(),
                    state.total_positions()
                );
                break;
            }
        }

        match state.best() {
            Some(best) => log::info!(
                "{} sweep best: {:.4} (score {:.3e})",
                state.phase(),
                best.position,
                best.score
            ),
            None => log::warn!("{} sweep found no positive score", state.phase()),
        }

        Ok(state.into_best())
    }

    fn into_report(
        self,
        run_id: Uuid,
        start_position: f64,
        best_position: f64,
        coarse_best: Option<ScoreSample>,
        fine_best: Option<ScoreSample>,
        started: Instant,
    ) -> SearchReport {
        SearchReport {
            run_id,
            start_position,
            best_position,
            focus_found: fine_best.is_some(),
            coarse_best,
            fine_best,
            frames_captured: self.samples.len(),
            samples: self.samples,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}

fn no_focus<A>(
    axis: &mut A,
    config: &AutofocusConfig,
    phase: SearchPhase,
    start_position: f64,
) -> Result<f64, AutofocusError>
where
    A: FocusAxis + ?Sized,
{
    match config.no_focus_policy {
        NoFocusPolicy::Fail => Err(AutofocusError::NoFocusFound { phase }),
        NoFocusPolicy::ReturnToStart => {
            log::warn!(
                "No focus found in {} sweep, returning to start position {:.4}",
                phase,
                start_position
            );
            move_and_settle(axis, start_position)?;
            Ok(start_position)
        }
    }
}

fn move_and_settle<A>(axis: &mut A, position: f64) -> Result<(), AutofocusError>
where
    A: FocusAxis + ?Sized,
{
    hardware(axis.move_to(position), "move axis")?;
    hardware(axis.wait_until_settled(), "wait for axis to settle")?;
    Ok(())
}

fn hardware<T>(result: Result<T, HardwareError>, action: &str) -> Result<T, AutofocusError> {
    result.map_err(|e| {
        log::error!("Autofocus aborted: failed to {}: {}", action, e);
        AutofocusError::HardwareFailure(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(position: f64, score: f64) -> ScoreSample {
        ScoreSample::new(position, score, SearchPhase::Coarse)
    }

    #[test]
    fn test_positions_are_centered() {
        let mut state = SearchState::new(SearchPhase::Coarse, 10.0, 2.0, 2);
        let positions: Vec<f64> = std::iter::from_fn(|| state.next_position()).collect();
        assert_eq!(positions, vec![6.0, 8.0, 10.0, 12.0, 14.0]);
    }

    #[test]
    fn test_zero_scores_never_become_best() {
        let mut state = SearchState::new(SearchPhase::Fine, 0.0, 1.0, 1);
        assert_eq!(state.observe(&sample(0.0, 0.0), 0.02), StepOutcome::Continue);
        assert_eq!(state.observe(&sample(1.0, -3.0), 0.02), StepOutcome::Continue);
        assert!(state.best().is_none());
    }

    #[test]
    fn test_early_exit_on_relative_drop() {
        let mut state = SearchState::new(SearchPhase::Coarse, 0.0, 1.0, 2);
        assert_eq!(state.observe(&sample(-2.0, 10.0), 0.02), StepOutcome::Improved);
        assert_eq!(state.observe(&sample(-1.0, 10.0), 0.02), StepOutcome::Continue);
        assert_eq!(state.observe(&sample(0.0, 5.0), 0.02), StepOutcome::EarlyExit);
        assert_eq!(state.best().map(|b| b.position), Some(-2.0));
    }

    #[test]
    fn test_small_drop_within_threshold_continues() {
        let mut state = SearchState::new(SearchPhase::Coarse, 0.0, 1.0, 2);
        state.observe(&sample(0.0, 100.0), 0.02);
        assert_eq!(state.observe(&sample(1.0, 98.0), 0.02), StepOutcome::Continue);
        assert_eq!(state.observe(&sample(2.0, 97.9), 0.02), StepOutcome::EarlyExit);
    }
}
