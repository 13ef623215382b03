//! Named string settings, as presented by host configuration dialogs.

use super::{AutofocusConfig, AutofocusError};
use crate::quality::ScoringMethod;
use serde::{Deserialize, Serialize};

pub const KEY_SIZE_FIRST: &str = "1st step size";
pub const KEY_NUM_FIRST: &str = "1st step number";
pub const KEY_SIZE_SECOND: &str = "2nd step size";
pub const KEY_NUM_SECOND: &str = "2nd step number";
pub const KEY_THRESHOLD: &str = "Threshold";
pub const KEY_CROP_RATIO: &str = "Crop ratio";
pub const KEY_EXPOSURE_TIME: &str = "Exposure Time";
pub const KEY_SCORING_METHOD: &str = "Maximize";
pub const KEY_CHANNEL: &str = "Channel";

/// Value shown for "no channel" and "keep current exposure"
pub const NONE_VALUE: &str = "";

pub const ALL_KEYS: [&str; 9] = [
    KEY_SIZE_FIRST,
    KEY_NUM_FIRST,
    KEY_SIZE_SECOND,
    KEY_NUM_SECOND,
    KEY_THRESHOLD,
    KEY_CROP_RATIO,
    KEY_EXPOSURE_TIME,
    KEY_SCORING_METHOD,
    KEY_CHANNEL,
];

/// One named setting with its current value and, if restricted, the allowed values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyItem {
    pub name: String,
    pub value: String,
    pub allowed: Vec<String>,
}

impl AutofocusConfig {
    pub fn property(&self, key: &str) -> Result<String, AutofocusError> {
        let value = match key {
            KEY_SIZE_FIRST => self.coarse_step_size.to_string(),
            KEY_NUM_FIRST => self.coarse_steps.to_string(),
            KEY_SIZE_SECOND => self.fine_step_size.to_string(),
            KEY_NUM_SECOND => self.fine_steps.to_string(),
            KEY_THRESHOLD => self.threshold.to_string(),
            KEY_CROP_RATIO => self.crop_fraction.to_string(),
            KEY_EXPOSURE_TIME => self
                .exposure_ms
                .map(|e| e.to_string())
                .unwrap_or_else(|| NONE_VALUE.to_string()),
            KEY_SCORING_METHOD => self.scoring_method.label().to_string(),
            KEY_CHANNEL => self.channel.clone().unwrap_or_default(),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Parse `value` into the field named by `key`.
    ///
    /// The result is validated as a whole before it replaces `self`.
    pub fn set_property(&mut self, key: &str, value: &str) -> Result<(), AutofocusError> {
        let value = value.trim();
        let mut updated = self.clone();

        match key {
            KEY_SIZE_FIRST => updated.coarse_step_size = parse(key, value)?,
            KEY_NUM_FIRST => updated.coarse_steps = parse(key, value)?,
            KEY_SIZE_SECOND => updated.fine_step_size = parse(key, value)?,
            KEY_NUM_SECOND => updated.fine_steps = parse(key, value)?,
            KEY_THRESHOLD => updated.threshold = parse(key, value)?,
            KEY_CROP_RATIO => updated.crop_fraction = parse(key, value)?,
            KEY_EXPOSURE_TIME => {
                updated.exposure_ms = if value.is_empty() {
                    None
                } else {
                    Some(parse(key, value)?)
                }
            }
            KEY_SCORING_METHOD => {
                updated.scoring_method = ScoringMethod::from_label(value).ok_or_else(|| {
                    AutofocusError::InvalidConfiguration(format!(
                        "'{}' must be one of Edges, StDev; got '{}'",
                        key, value
                    ))
                })?
            }
            KEY_CHANNEL => {
                updated.channel = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                }
            }
            _ => return Err(unknown_key(key)),
        }

        updated.validate()?;
        log::debug!("Autofocus property '{}' set to '{}'", key, value);
        *self = updated;
        Ok(())
    }

    /// Every setting in display order. A configured channel that `channels`
    /// does not list is shown as no channel.
    pub fn properties(&self, channels: &[String]) -> Vec<PropertyItem> {
        ALL_KEYS
            .iter()
            .map(|key| {
                let mut value = self.property(key).unwrap_or_default();
                let allowed = match *key {
                    KEY_SCORING_METHOD => ScoringMethod::ALL
                        .iter()
                        .map(|m| m.label().to_string())
                        .collect(),
                    KEY_CHANNEL => {
                        if !channels.contains(&value) {
                            value = NONE_VALUE.to_string();
                        }
                        std::iter::once(NONE_VALUE.to_string())
                            .chain(channels.iter().cloned())
                            .collect()
                    }
                    _ => Vec::new(),
                };
                PropertyItem {
                    name: key.to_string(),
                    value,
                    allowed,
                }
            })
            .collect()
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AutofocusError> {
    value.parse().map_err(|_| {
        AutofocusError::InvalidConfiguration(format!("cannot parse '{}' for '{}'", value, key))
    })
}

fn unknown_key(key: &str) -> AutofocusError {
    AutofocusError::InvalidConfiguration(format!("unknown property '{}'", key))
}
