//! Simulation tuning
//!
//! [`SimConfig`] is read from an optional RON file. Missing fields fall back
//! to [`defaults`], so a settings file only needs the values it changes.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Built-in values for every tunable
pub mod defaults {
    /// Per-axis velocity limit (units per second)
    pub const MAX_VELOCITY: f32 = 225.0;
    /// Fraction of velocity shed per second
    pub const DRAG: f32 = 0.75;
    /// Speeds at or below this snap to zero
    pub const REST_SPEED: f32 = 0.01;
    /// Health at or below which a death counts as violent
    pub const GIB_HEALTH: f32 = -25.0;
    /// Default multiplier for forces applied to the player
    pub const FORCE_MULTIPLIER: f32 = 5.0;
    /// Default ray length for traces
    pub const TRACE_LENGTH: f32 = 5000.0;
    /// Longest frame delta the wall-clock driver will report (seconds)
    pub const MAX_DELTA: f32 = 0.25;
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse settings: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub max_velocity: f32,
    pub drag: f32,
    pub rest_speed: f32,
    pub gib_health: f32,
    pub force_multiplier: f32,
    pub trace_length: f32,
    pub max_delta: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_velocity: defaults::MAX_VELOCITY,
            drag: defaults::DRAG,
            rest_speed: defaults::REST_SPEED,
            gib_health: defaults::GIB_HEALTH,
            force_multiplier: defaults::FORCE_MULTIPLIER,
            trace_length: defaults::TRACE_LENGTH,
            max_delta: defaults::MAX_DELTA,
        }
    }
}

impl SimConfig {
    /// Load settings from a RON file; a missing file yields the defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => Self::from_ron(&contents),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No settings at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_ron(s: &str) -> Result<Self, SettingsError> {
        let config: SimConfig = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let checks = [
            ("max_velocity", self.max_velocity > 0.0),
            ("drag", (0.0..=1.0).contains(&self.drag)),
            ("rest_speed", self.rest_speed >= 0.0),
            ("force_multiplier", self.force_multiplier.is_finite()),
            ("trace_length", self.trace_length > 0.0),
            ("max_delta", self.max_delta > 0.0),
        ];
        for (name, ok) in checks {
            if !ok {
                return Err(SettingsError::Invalid(format!("{} is out of range", name)));
            }
        }
        Ok(())
    }
}
