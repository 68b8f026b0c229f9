use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::mechanics::thermal;

/// First-order lag parameters. Immutable for one run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantParams {
    /// K: °C of steady-state lift at full actuation.
    pub gain: f64,
    /// τ in seconds, > 0.
    pub time_constant: f64,
    /// Δt in seconds, > 0.
    pub step_size: f64,
}

impl Default for PlantParams {
    fn default() -> Self {
        Self { gain: 25.0, time_constant: 15.0, step_size: 15.0 }
    }
}

impl PlantParams {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !self.gain.is_finite() {
            return Err(ConfigError::invalid("plant.gain", self.gain, "must be finite"));
        }
        if !(self.time_constant.is_finite() && self.time_constant > 0.0) {
            return Err(ConfigError::invalid("plant.time_constant", self.time_constant, "must be > 0"));
        }
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(ConfigError::invalid("plant.step_size", self.step_size, "must be > 0"));
        }
        Ok(())
    }
}

/// Room model advanced by explicit Euler steps.
///
/// Holds no temperature of its own; the caller owns the state and threads it
/// through [`ThermalPlant::update`].
#[derive(Clone, Copy, Debug)]
pub struct ThermalPlant {
    params: PlantParams,
}

impl ThermalPlant {
    pub fn new(params: PlantParams) -> Result<Self> {
        params.validate()?;
        let ratio = params.step_size / params.time_constant;
        if ratio > 2.0 {
            tracing::warn!(
                step_size = params.step_size,
                time_constant = params.time_constant,
                ratio,
                "Euler step exceeds the stability limit dt/tau <= 2; temperatures will oscillate and grow"
            );
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &PlantParams {
        &self.params
    }

    /// `temp + Δt·(−temp + K·actuation + ambient)/τ`; `actuation` is 0/1 for
    /// the heater, or a relaxed value in [0, 1].
    #[inline]
    pub fn update(&self, temp: f64, actuation: f64, ambient: f64) -> f64 {
        let p = &self.params;
        thermal::euler_step(temp, actuation, ambient, p.gain, p.time_constant, p.step_size)
    }

    /// 1 − Δt/τ.
    #[inline]
    pub fn decay(&self) -> f64 {
        thermal::decay(self.params.time_constant, self.params.step_size)
    }

    /// K·Δt/τ.
    #[inline]
    pub fn input_gain(&self) -> f64 {
        thermal::input_gain(self.params.gain, self.params.time_constant, self.params.step_size)
    }

    /// Steps per simulated hour, rounded up.
    pub fn steps_per_hour(&self) -> usize {
        (3600.0 / self.params.step_size).ceil().max(1.0) as usize
    }
}
