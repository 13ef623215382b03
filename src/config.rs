//! Configuration management for CrabFocus
//!
//! Provides configuration loading, saving, and management for the
//! autofocus routine and the built-in microscope simulator.

use crate::autofocus::AutofocusConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix for environment overrides, e.g. `CRABFOCUS__AUTOFOCUS__THRESHOLD=0.05`
pub const ENV_PREFIX: &str = "CRABFOCUS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config file {path:?}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to assemble layered config: {0}")]
    Layered(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrabFocusConfig {
    pub autofocus: AutofocusConfig,
    pub simulation: SimulationConfig,
}

/// Simulated stage and camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Axis position of perfect focus
    pub focal_plane: f64,
    /// Axis position when the simulation starts
    pub start_position: f64,
    /// Rendered frame size [width, height]
    pub frame_size: [u32; 2],
    /// Checkerboard square size in pixels
    pub pattern_period: u32,
    /// Gaussian blur sigma (pixels) per axis unit away from the focal plane
    pub blur_per_unit: f64,
    /// Upper bound on the blur sigma
    pub max_blur_sigma: f64,
    /// Render 16-bit frames instead of 8-bit
    pub sixteen_bit: bool,
    /// Channel presets the simulated camera offers
    pub channels: Vec<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            focal_plane: 1.0,
            start_position: 0.0,
            frame_size: [128, 128],
            pattern_period: 8,
            blur_per_unit: 1.5,
            max_blur_sigma: 12.0,
            sixteen_bit: false,
            channels: vec!["DAPI".to_string(), "FITC".to_string()],
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.frame_size[0] == 0 || self.frame_size[1] == 0 {
            return Err("Invalid simulation frame size".to_string());
        }
        if self.pattern_period == 0 {
            return Err("Pattern period must be at least 1 pixel".to_string());
        }
        if !(self.blur_per_unit.is_finite() && self.blur_per_unit >= 0.0) {
            return Err("Blur per unit must be a non-negative number".to_string());
        }
        if !(self.max_blur_sigma.is_finite() && self.max_blur_sigma >= 0.0) {
            return Err("Max blur sigma must be a non-negative number".to_string());
        }
        if !self.focal_plane.is_finite() || !self.start_position.is_finite() {
            return Err("Focal plane and start position must be finite".to_string());
        }
        Ok(())
    }
}

impl CrabFocusConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: CrabFocusConfig = toml::from_str(&contents)?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load an optional TOML file, then apply `CRABFOCUS__*` environment overrides
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: CrabFocusConfig = settings.try_deserialize()?;
        log::debug!("Layered configuration assembled from {:?} and environment", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let toml_string = self.to_toml()?;

        fs::write(path, toml_string).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("crabfocus.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_layered(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.autofocus
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.simulation.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }
}
