use neuroflight_core::InputMode;
use neuroflight_system_camera::CameraConfig;
use neuroflight_system_flight::FlightConfig;
use neuroflight_system_input::DEFAULT_START_HOLD_SECONDS;
use neuroflight_system_worldgen::WorldLayout;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything needed to mount a simulation session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Source that drives the drone when the session starts.
    pub input_mode: InputMode,
    /// Seconds the external `start` bit must be held before takeoff.
    pub start_hold_seconds: f32,
    /// Flight controller tuning.
    pub flight: FlightConfig,
    /// Chase camera tuning.
    pub camera: CameraConfig,
    /// City grid parameters.
    pub layout: WorldLayout,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            input_mode: InputMode::Keyboard,
            start_hold_seconds: DEFAULT_START_HOLD_SECONDS,
            flight: FlightConfig::default(),
            camera: CameraConfig::default(),
            layout: WorldLayout::default(),
        }
    }
}

/// Errors raised while reading a [`SimulationConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid TOML or does not match the schema.
    #[error("failed to parse simulation config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value parsed but lies outside its usable range.
    #[error("invalid `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending value.
        field: &'static str,
        /// Human-readable explanation.
        reason: String,
    },
}

impl SimulationConfig {
    /// Parses and validates a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would stall or destabilise the simulation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.start_hold_seconds >= 0.0) {
            return Err(invalid(
                "start_hold_seconds",
                format!("must be non-negative, got {}", self.start_hold_seconds),
            ));
        }
        if !(self.flight.drag > 0.0 && self.flight.drag <= 1.0) {
            return Err(invalid(
                "flight.drag",
                format!("must lie in (0, 1], got {}", self.flight.drag),
            ));
        }
        if !(self.flight.bounds_xz > 0.0) {
            return Err(invalid(
                "flight.bounds_xz",
                format!("must be positive, got {}", self.flight.bounds_xz),
            ));
        }
        if !(self.flight.bounce_min <= self.flight.bounce_max) {
            return Err(invalid(
                "flight.bounce_min",
                format!(
                    "must not exceed bounce_max ({} > {})",
                    self.flight.bounce_min, self.flight.bounce_max
                ),
            ));
        }
        if !(self.layout.grid_spacing > 0.0) {
            return Err(invalid(
                "layout.grid_spacing",
                format!("must be positive, got {}", self.layout.grid_spacing),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = SimulationConfig::from_toml_str("").expect("defaults parse");
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn nested_sections_override_individual_values() {
        let config = SimulationConfig::from_toml_str(
            "input_mode = \"external\"\n[flight]\nturn_speed = 2.5\n[camera]\nlook_ahead = 6.0\n",
        )
        .expect("config parses");

        assert_eq!(config.input_mode, InputMode::External);
        assert_eq!(config.flight.turn_speed, 2.5);
        assert_eq!(config.flight.drag, FlightConfig::default().drag);
        assert_eq!(config.camera.look_ahead, 6.0);
    }

    #[test]
    fn out_of_range_drag_is_rejected() {
        let error = SimulationConfig::from_toml_str("[flight]\ndrag = 1.5\n")
            .expect_err("drag above one");
        assert!(matches!(
            error,
            ConfigError::Invalid {
                field: "flight.drag",
                ..
            }
        ));
    }

    #[test]
    fn malformed_document_reports_parse_error() {
        let error = SimulationConfig::from_toml_str("input_mode = 3").expect_err("bad type");
        assert!(matches!(error, ConfigError::Parse(_)));
    }
}
