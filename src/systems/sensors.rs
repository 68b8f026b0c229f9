//! Redundant temperature sensors with fault injection and fusion.
//!
//! Each call to [`SensorArray::measure`] draws one reading per sensor from
//! Normal(true temperature, 0.2 °C), applies the configured fault to sensor 0,
//! and fuses the readings into a single estimate.

use bevy_prng::WyRand;
use rand_core::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::mechanics::{fusion, stoch};

/// Sensor accuracy, one standard deviation in °C.
pub const SENSOR_SIGMA: f64 = 0.2;

/// Fault injected into sensor 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaultMode {
    #[default]
    None,
    /// Reads 0 °C.
    Short,
    /// Half of the reads carry a Uniform[0, 5) °C positive offset.
    FaultyConnection,
    /// Every read carries a Normal(5, 1) °C bias.
    Overheated,
}

/// Sensor array settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub count: usize,
    pub fault: FaultMode,
    pub weighted_mean: bool,
    pub seed: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self { count: 5, fault: FaultMode::None, weighted_mean: false, seed: 0x5eed }
    }
}

impl SensorConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.count < 1 {
            return Err(ConfigError::invalid("sensors.count", self.count, "needs at least one sensor"));
        }
        Ok(())
    }
}

/// Fuse readings: disagreement-weighted mean when `weighted` and there are
/// at least two readings, arithmetic mean otherwise.
pub fn fuse(readings: &[f64], weighted: bool) -> f64 {
    if weighted && readings.len() > 1 {
        fusion::weighted_mean(readings)
    } else {
        fusion::mean(readings)
    }
}

pub struct SensorArray {
    cfg: SensorConfig,
    rng: WyRand,
}

impl SensorArray {
    pub fn new(cfg: SensorConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self { cfg, rng: WyRand::from_seed(cfg.seed.to_le_bytes()) })
    }

    pub fn config(&self) -> &SensorConfig {
        &self.cfg
    }

    /// One raw reading per sensor, fault already applied to sensor 0.
    pub fn readings(&mut self, true_temp: f64) -> Vec<f64> {
        let mut xs: Vec<f64> = (0..self.cfg.count)
            .map(|_| stoch::normal(&mut self.rng, true_temp, SENSOR_SIGMA))
            .collect();
        match self.cfg.fault {
            FaultMode::None => {}
            FaultMode::Short => xs[0] = 0.0,
            FaultMode::FaultyConnection => {
                if stoch::bernoulli(&mut self.rng, 0.5) {
                    xs[0] += stoch::uniform(&mut self.rng, 0.0, 5.0);
                }
            }
            FaultMode::Overheated => xs[0] += stoch::normal(&mut self.rng, 5.0, 1.0),
        }
        xs
    }

    /// Fused estimate of `true_temp`.
    pub fn measure(&mut self, true_temp: f64) -> f64 {
        let xs = self.readings(true_temp);
        fuse(&xs, self.cfg.weighted_mean)
    }
}
