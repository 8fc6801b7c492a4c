//! Tunable engine parameters.
//!
//! Every field has a default matching the shipped levels, so a config file
//! only needs to name what it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Cost of one orthogonal step.
pub const BASE_COST: f64 = 1.0;
/// Cost factor applied while the speed boost is active.
pub const SPEED_BOOST_MULTIPLIER: f64 = 0.5;
/// Cells around the hazard that carry a proximity surcharge.
pub const DANGER_RADIUS: u32 = 2;
/// Surcharge per unit of closeness inside the danger radius.
pub const PROXIMITY_PENALTY_SCALE: f64 = 3.0;
/// Manhattan distance at which the hazard switches to chasing.
pub const CHASE_RANGE: u32 = 8;
/// Hazard steps per second when a level does not say otherwise.
pub const HAZARD_SPEED: f64 = 0.5;
/// Seconds the hazard dwells at each patrol waypoint.
pub const HAZARD_PAUSE_SECS: f64 = 2.0;
/// Seconds between mover steps while following a planned path.
pub const MOVER_STEP_SECS: f64 = 0.2;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub danger_radius: u32,
    pub proximity_penalty_scale: f64,
    pub speed_boost_multiplier: f64,
    pub chase_range: u32,
    pub hazard_speed: f64,
    pub hazard_pause_secs: f64,
    pub mover_step_secs: f64,
    pub allow_diagonal: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            danger_radius: DANGER_RADIUS,
            proximity_penalty_scale: PROXIMITY_PENALTY_SCALE,
            speed_boost_multiplier: SPEED_BOOST_MULTIPLIER,
            chase_range: CHASE_RANGE,
            hazard_speed: HAZARD_SPEED,
            hazard_pause_secs: HAZARD_PAUSE_SECS,
            mover_step_secs: MOVER_STEP_SECS,
            allow_diagonal: false,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Rejects values that would make costs negative or timing meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("proximity_penalty_scale", self.proximity_penalty_scale)?;
        non_negative("speed_boost_multiplier", self.speed_boost_multiplier)?;
        non_negative("hazard_pause_secs", self.hazard_pause_secs)?;
        non_negative("mover_step_secs", self.mover_step_secs)?;
        if !(self.hazard_speed.is_finite() && self.hazard_speed > 0.0) {
            return Err(ConfigError::Invalid {
                field: "hazard_speed",
                reason: format!("must be a positive number, got {}", self.hazard_speed),
            });
        }
        Ok(())
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be a finite non-negative number, got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str("chase_range = 3\nallow_diagonal = true").unwrap();
        assert_eq!(config.chase_range, 3);
        assert!(config.allow_diagonal);
        assert_eq!(config.danger_radius, DANGER_RADIUS);
    }

    #[test]
    fn negative_penalty_is_rejected() {
        let err = EngineConfig::from_toml_str("proximity_penalty_scale = -1.0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "proximity_penalty_scale",
                ..
            }
        ));
    }

    #[test]
    fn zero_hazard_speed_is_rejected() {
        assert!(EngineConfig::from_toml_str("hazard_speed = 0.0").is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            EngineConfig::from_toml_str("chase_range = \"far\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
