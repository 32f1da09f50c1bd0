use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CHANNELS, MAX_CHANNELS, MIN_CHANNELS};
use crate::error::{Error, Result};
use crate::types::ProjectionSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// Hours east of UTC; `None` derives it from the longitude.
    pub timezone_offset_hours: Option<f64>,
    pub projection: ProjectionSettings,
    pub num_channels: u8,
    pub pwm_scale: f32,
    pub enabled: bool,
    pub update_interval_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            latitude: 37.7749,
            longitude: -122.4194,
            timezone_offset_hours: None,
            projection: ProjectionSettings::default(),
            num_channels: DEFAULT_CHANNELS,
            pwm_scale: 1.0,
            enabled: true,
            update_interval_ms: 1000,
        }
    }
}

impl ControllerConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn effective_timezone_offset(&self) -> f64 {
        self.timezone_offset_hours
            .unwrap_or(self.longitude / 15.0)
    }

    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::InvalidConfig(format!(
                "latitude {} outside -90..=90",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::InvalidConfig(format!(
                "longitude {} outside -180..=180",
                self.longitude
            )));
        }
        if !(MIN_CHANNELS..=MAX_CHANNELS).contains(&self.num_channels) {
            return Err(Error::InvalidConfig(format!(
                "num_channels {} outside {}..={}",
                self.num_channels, MIN_CHANNELS, MAX_CHANNELS
            )));
        }
        if !(0.0..=1.0).contains(&self.pwm_scale) {
            return Err(Error::InvalidConfig(format!(
                "pwm_scale {} outside 0..=1",
                self.pwm_scale
            )));
        }
        Ok(())
    }
}
