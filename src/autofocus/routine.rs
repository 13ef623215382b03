use super::properties::PropertyItem;
use super::search::{run_search_with_report, SearchReport};
use super::{AutofocusConfig, AutofocusError};
use crate::errors::HardwareError;
use crate::hardware::{FocusAxis, FrameSource};
use crate::quality::{FocusScorer, SharpnessScorer};
use std::sync::{Mutex, MutexGuard, RwLock, TryLockError};

/// Name reported to hosts
pub const ROUTINE_NAME: &str = "CrabFocus two-phase sharpness";

struct Hardware<A, C> {
    axis: A,
    source: C,
}

#[derive(Debug, Clone, Default)]
struct RunStatus {
    last_report: Option<SearchReport>,
    last_error: Option<String>,
}

/// Camera state captured before a search and put back afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SavedCameraState {
    shutter_open: bool,
    auto_shutter: bool,
    exposure_ms: f64,
}

impl SavedCameraState {
    fn read<C: FrameSource + ?Sized>(source: &C) -> Result<Self, HardwareError> {
        Ok(Self {
            shutter_open: source.shutter_open()?,
            auto_shutter: source.auto_shutter()?,
            exposure_ms: source.exposure()?,
        })
    }

    /// Attempt every restore step; report the first failure.
    fn restore<C: FrameSource + ?Sized>(&self, source: &mut C) -> Result<(), HardwareError> {
        let shutter = source.set_shutter_open(self.shutter_open);
        let auto = source.set_auto_shutter(self.auto_shutter);
        let exposure = source.set_exposure(self.exposure_ms);
        shutter.and(auto).and(exposure)
    }
}

/// Host-facing autofocus routine.
///
/// Owns the focus axis and frame source. At most one search runs at a
/// time: a second caller gets [`AutofocusError::AlreadyRunning`] instead
/// of queueing behind the first.
pub struct AutofocusRoutine<A, C> {
    hardware: Mutex<Hardware<A, C>>,
    config: RwLock<AutofocusConfig>,
    status: Mutex<RunStatus>,
}

impl<A, C> AutofocusRoutine<A, C>
where
    A: FocusAxis,
    C: FrameSource,
{
    pub fn new(axis: A, source: C, config: AutofocusConfig) -> Self {
        Self {
            hardware: Mutex::new(Hardware { axis, source }),
            config: RwLock::new(config),
            status: Mutex::new(RunStatus::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        ROUTINE_NAME
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> Result<AutofocusConfig, AutofocusError> {
        self.config
            .read()
            .map(|c| c.clone())
            .map_err(|_| AutofocusError::PoisonedLock)
    }

    /// Replace the configuration after validating it
    pub fn set_config(&self, config: AutofocusConfig) -> Result<(), AutofocusError> {
        config.validate()?;
        let mut guard = self.config.write().map_err(|_| AutofocusError::PoisonedLock)?;
        *guard = config;
        Ok(())
    }

    /// Run the full two-phase search and return the final position.
    pub fn full_focus(&self) -> Result<f64, AutofocusError> {
        self.full_focus_with_report().map(|report| report.best_position)
    }

    /// Same search as [`Self::full_focus`]; there is no cheaper incremental mode.
    pub fn incremental_focus(&self) -> Result<f64, AutofocusError> {
        self.full_focus()
    }

    pub fn full_focus_with_report(&self) -> Result<SearchReport, AutofocusError> {
        let mut hardware = self.lock_hardware()?;
        let config = self.config()?;

        let result = Self::focus_locked(&mut hardware, &config);

        let mut status = self.status.lock().map_err(|_| AutofocusError::PoisonedLock)?;
        match &result {
            Ok(report) => {
                status.last_report = Some(report.clone());
                status.last_error = None;
            }
            Err(e) => {
                status.last_report = None;
                status.last_error = Some(e.to_string());
            }
        }

        result
    }

    fn focus_locked(
        hardware: &mut Hardware<A, C>,
        config: &AutofocusConfig,
    ) -> Result<SearchReport, AutofocusError> {
        config.validate()?;
        let scorer = SharpnessScorer::new(config.crop_fraction, config.scoring_method)?;

        let Hardware { axis, source } = hardware;
        let saved = SavedCameraState::read(&*source)?;
        log::debug!("Saved camera state: {:?}", saved);

        let result = Self::prepare_source(source, config)
            .map_err(AutofocusError::from)
            .and_then(|()| run_search_with_report(axis, source, &scorer, config));

        let restored = saved.restore(source);

        match (result, restored) {
            (Ok(report), Ok(())) => Ok(report),
            (Ok(_), Err(e)) => {
                log::error!("Failed to restore camera state after autofocus: {}", e);
                Err(e.into())
            }
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore_err)) => {
                log::warn!(
                    "Failed to restore camera state after aborted autofocus: {}",
                    restore_err
                );
                Err(e)
            }
        }
    }

    fn prepare_source(source: &mut C, config: &AutofocusConfig) -> Result<(), HardwareError> {
        source.set_shutter_open(true)?;
        source.set_auto_shutter(false)?;

        if let Some(channel) = &config.channel {
            log::info!("Selecting channel '{}' for autofocus", channel);
            source.select_channel(channel)?;
        }

        if let Some(exposure) = config.exposure_ms {
            source.set_exposure(exposure)?;
        }

        Ok(())
    }

    /// Score a single frame captured at the current axis position
    pub fn current_focus_score(&self) -> Result<f64, AutofocusError> {
        let mut hardware = self.lock_hardware()?;
        let config = self.config()?;
        let scorer = SharpnessScorer::new(config.crop_fraction, config.scoring_method)?;
        let frame = hardware.source.capture()?;
        Ok(scorer.score(&frame))
    }

    /// Frames captured by the last successful run
    pub fn number_of_images(&self) -> usize {
        self.status
            .lock()
            .ok()
            .and_then(|s| s.last_report.as_ref().map(|r| r.frames_captured))
            .unwrap_or(0)
    }

    pub fn last_report(&self) -> Option<SearchReport> {
        self.status.lock().ok().and_then(|s| s.last_report.clone())
    }

    /// One-line status for host UIs
    pub fn verbose_status(&self) -> String {
        match self.status.lock() {
            Ok(status) => match (&status.last_report, &status.last_error) {
                (_, Some(err)) => format!("Failed: {}", err),
                (Some(report), None) => format!(
                    "OK: {:.4} after {} frames",
                    report.best_position, report.frames_captured
                ),
                (None, None) => "Idle".to_string(),
            },
            Err(_) => "Unknown: status lock poisoned".to_string(),
        }
    }

    pub fn property(&self, key: &str) -> Result<String, AutofocusError> {
        self.config()?.property(key)
    }

    /// Parse and apply one named setting; nothing changes on error.
    pub fn set_property(&self, key: &str, value: &str) -> Result<(), AutofocusError> {
        let mut guard = self.config.write().map_err(|_| AutofocusError::PoisonedLock)?;
        guard.set_property(key, value)
    }

    /// All named settings, with the source's channels as allowed values
    pub fn properties(&self) -> Result<Vec<PropertyItem>, AutofocusError> {
        let channels = {
            let hardware = self.lock_hardware()?;
            hardware.source.available_channels()
        };
        Ok(self.config()?.properties(&channels))
    }

    /// Give the hardware back
    pub fn into_parts(self) -> Result<(A, C), AutofocusError> {
        let hardware = self
            .hardware
            .into_inner()
            .map_err(|_| AutofocusError::PoisonedLock)?;
        Ok((hardware.axis, hardware.source))
    }

    fn lock_hardware(&self) -> Result<MutexGuard<'_, Hardware<A, C>>, AutofocusError> {
        match self.hardware.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::WouldBlock) => {
                log::warn!("Autofocus requested while another run is active");
                Err(AutofocusError::AlreadyRunning)
            }
            Err(TryLockError::Poisoned(_)) => Err(AutofocusError::PoisonedLock),
        }
    }
}
