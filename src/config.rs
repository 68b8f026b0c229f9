//! Configuration surface.
//!
//! ## Responsibility
//! Hold every knob an outer caller (UI, CLI, test) sets before a run, parse
//! it from TOML, and validate the cross-field rules the types cannot express.
//!
//! ## Guarantees
//! - A config returned by [`load_from_str`] / [`load_from_file`] is validated
//! - Validation collects *all* violated rules before returning
//! - Missing sections and fields fall back to the defaults below
//!
//! ```toml
//! initial_temperature = 15.0
//!
//! [plant]
//! gain = 25.0
//! time_constant = 15.0
//! step_size = 15.0
//!
//! [sensors]
//! count = 5
//! fault = "overheated"
//! weighted_mean = true
//!
//! [control]
//! gains = { p = 1.0, i = 0.0, d = 0.0 }
//! measure_period = 1
//! control_period = 4
//! references = [20.0, 22.0]
//! policy = { decision = "dead-band", clamp = 1.0 }
//!
//! [ambient]
//! source = "synthetic"
//! temperatures = [-5.0, 5.0]
//! hours = 24
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::systems::ambient::{AmbientSeries, HourlyDataset, Timestamp};
use crate::systems::pid::{ControlPolicy, Gains};
use crate::systems::plant::PlantParams;
use crate::systems::sensors::SensorConfig;

#[cfg(feature = "system-autotune")]
use crate::systems::autotune::TunerConfig;

#[cfg(feature = "scenario-session")]
use crate::scenarios::SessionConfig;

/// Controller settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub gains: Gains,
    pub policy: ControlPolicy,
    /// Plant steps between sensor readings.
    pub measure_period: usize,
    /// Plant steps between control ticks.
    pub control_period: usize,
    /// Reference schedule, spread evenly over the horizon.
    pub references: Vec<f64>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            gains: Gains::default(),
            policy: ControlPolicy::default(),
            measure_period: 1,
            control_period: 1,
            references: vec![20.0],
        }
    }
}

impl ControlConfig {
    fn check(&self, problems: &mut Vec<ConfigError>) {
        if !self.gains.is_finite() {
            problems.push(ConfigError::invalid("control.gains", format!("{:?}", self.gains), "must be finite"));
        }
        if let Err(e) = self.policy.validate() {
            problems.push(e);
        }
        if self.measure_period < 1 {
            problems.push(ConfigError::invalid("control.measure_period", self.measure_period, "must be >= 1"));
        }
        if self.control_period < 1 {
            problems.push(ConfigError::invalid("control.control_period", self.control_period, "must be >= 1"));
        }
        if self.references.is_empty() {
            problems.push(ConfigError::invalid("control.references", "[]", "needs at least one set-point"));
        } else if let Some(bad) = self.references.iter().find(|r| !r.is_finite()) {
            problems.push(ConfigError::invalid("control.references", bad, "must be finite"));
        }
    }
}

/// Where the outdoor temperature comes from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "kebab-case")]
pub enum AmbientSource {
    /// Rows `[start, end]` of an external hourly table.
    Historical { start: Timestamp, end: Timestamp },
    /// Constant segments spread evenly over `hours` samples.
    Synthetic { temperatures: Vec<f64>, hours: usize },
}

impl Default for AmbientSource {
    fn default() -> Self {
        AmbientSource::Synthetic { temperatures: vec![-5.0, 5.0], hours: 24 }
    }
}

impl AmbientSource {
    fn check(&self, problems: &mut Vec<ConfigError>) {
        if let AmbientSource::Synthetic { temperatures, hours } = self {
            if temperatures.is_empty() {
                problems.push(ConfigError::invalid("ambient.temperatures", "[]", "needs at least one value"));
            } else if let Some(bad) = temperatures.iter().find(|t| !t.is_finite()) {
                problems.push(ConfigError::invalid("ambient.temperatures", bad, "must be finite"));
            }
            if *hours < 1 {
                problems.push(ConfigError::invalid("ambient.hours", hours, "must be >= 1"));
            }
        }
    }

    /// Build the series. Historical sources need `dataset`; lookup failures
    /// surface here, before any step runs.
    pub fn resolve(&self, dataset: Option<&dyn HourlyDataset>) -> Result<AmbientSeries> {
        match self {
            AmbientSource::Synthetic { temperatures, hours } => AmbientSeries::synthetic(temperatures, *hours),
            AmbientSource::Historical { start, end } => {
                let ds = dataset.ok_or_else(|| {
                    ConfigError::Validation("historical ambient source needs an hourly dataset".into())
                })?;
                AmbientSeries::from_dataset(ds, start, end)
            }
        }
    }
}

/// Everything one simulation (and optionally one tuning run) needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub initial_temperature: f64,
    pub plant: PlantParams,
    pub sensors: SensorConfig,
    pub control: ControlConfig,
    pub ambient: AmbientSource,
    #[cfg(feature = "system-autotune")]
    pub tuner: TunerConfig,
    #[cfg(feature = "scenario-session")]
    pub session: SessionConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 15.0,
            plant: PlantParams::default(),
            sensors: SensorConfig::default(),
            control: ControlConfig::default(),
            ambient: AmbientSource::default(),
            #[cfg(feature = "system-autotune")]
            tuner: TunerConfig::default(),
            #[cfg(feature = "scenario-session")]
            session: SessionConfig::default(),
        }
    }
}

impl SimConfig {
    /// Check every rule; one violation is returned as-is, several are joined
    /// into [`ConfigError::Validation`].
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let mut problems = Vec::new();
        if !self.initial_temperature.is_finite() {
            problems.push(ConfigError::invalid("initial_temperature", self.initial_temperature, "must be finite"));
        }
        if let Err(e) = self.plant.validate() {
            problems.push(e);
        }
        if let Err(e) = self.sensors.validate() {
            problems.push(e);
        }
        self.control.check(&mut problems);
        self.ambient.check(&mut problems);
        #[cfg(feature = "system-autotune")]
        if let Err(e) = self.tuner.validate() {
            problems.push(e);
        }
        #[cfg(feature = "scenario-session")]
        if let Err(e) = self.session.validate() {
            problems.push(e);
        }

        match problems.len() {
            0 => Ok(()),
            1 => Err(problems.remove(0)),
            _ => Err(ConfigError::Validation(
                problems.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "),
            )),
        }
    }
}

/// Parse and validate a [`SimConfig`] from TOML text. `source_name` labels
/// parse errors.
pub fn load_from_str(content: &str, source_name: &str) -> std::result::Result<SimConfig, ConfigError> {
    let config: SimConfig = toml::from_str(content).map_err(|e| ConfigError::Parse {
        file: source_name.to_string(),
        source: e,
    })?;
    config.validate()?;
    Ok(config)
}

/// Read, parse and validate a [`SimConfig`] from a TOML file.
pub fn load_from_file(path: &Path) -> std::result::Result<SimConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        file: path.display().to_string(),
        source: e,
    })?;
    load_from_str(&content, &path.display().to_string())
}
