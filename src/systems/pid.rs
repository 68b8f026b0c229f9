//! Discrete PID controller driving an on/off heater.
//!
//! The controller collects fused readings into a buffer between ticks. On a
//! tick it averages the buffer, forms the error against the active
//! reference, updates its integral and derivative terms, and decides the
//! heater state. Between ticks the heater is held.
//!
//! Two conventions exist for scaling the integral/derivative terms and two
//! for turning the PID sum into an on/off decision. Both choices are carried
//! explicitly in [`ControlPolicy`].

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::mechanics::{control, fusion};

/// (P, I, D) gains.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gains {
    pub p: f64,
    pub i: f64,
    pub d: f64,
}

impl Default for Gains {
    fn default() -> Self {
        Self { p: 1.0, i: 0.0, d: 0.0 }
    }
}

impl Gains {
    pub const fn new(p: f64, i: f64, d: f64) -> Self {
        Self { p, i, d }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.p, self.i, self.d]
    }

    pub fn from_array([p, i, d]: [f64; 3]) -> Self {
        Self { p, i, d }
    }

    pub fn is_finite(&self) -> bool {
        self.p.is_finite() && self.i.is_finite() && self.d.is_finite()
    }

    /// g = P·err + I·integral + D·derivative.
    #[inline]
    pub fn combine(&self, err: f64, integral: f64, derivative: f64) -> f64 {
        self.p * err + self.i * integral + self.d * derivative
    }
}

/// How the integral and derivative terms see the control period.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorScaling {
    /// integral += err; derivative = err − prev.
    #[default]
    PerTick,
    /// integral += err·period; derivative = (err − prev)/period, period in steps.
    PerPeriod,
}

impl ErrorScaling {
    /// Weight of one tick in the integral, and divisor of the difference.
    #[inline]
    pub fn factor(self, period: usize) -> f64 {
        match self {
            ErrorScaling::PerTick => 1.0,
            ErrorScaling::PerPeriod => period.max(1) as f64,
        }
    }
}

/// How the PID sum becomes a heater decision.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "kebab-case")]
pub enum Decision {
    /// u = clip(g, 0, 1); ON iff u > 0.5.
    ClippedThreshold,
    /// err > clamp forces ON, err < −clamp forces OFF; inside the band
    /// (|err| ≤ clamp, inclusive) ON iff g > 0.
    DeadBand { clamp: f64 },
}

/// Decision rule plus error scaling, selected together.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlPolicy {
    #[serde(flatten)]
    pub decision: Decision,
    #[serde(default)]
    pub scaling: ErrorScaling,
}

impl Default for ControlPolicy {
    fn default() -> Self {
        Self::dead_band(1.0)
    }
}

impl ControlPolicy {
    /// Clipped threshold with period-scaled integral/derivative.
    pub fn clipped_threshold() -> Self {
        Self { decision: Decision::ClippedThreshold, scaling: ErrorScaling::PerPeriod }
    }

    /// Dead-band clamp with per-tick integral/derivative.
    pub fn dead_band(clamp: f64) -> Self {
        Self { decision: Decision::DeadBand { clamp }, scaling: ErrorScaling::PerTick }
    }

    pub fn with_scaling(mut self, scaling: ErrorScaling) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Decision::DeadBand { clamp } = self.decision {
            if !(clamp.is_finite() && clamp >= 0.0) {
                return Err(ConfigError::invalid("control.policy.clamp", clamp, "must be finite and >= 0"));
            }
        }
        Ok(())
    }

    /// Heater decision for this tick's error and PID sum.
    pub fn decide(&self, err: f64, g: f64) -> Heater {
        match self.decision {
            Decision::ClippedThreshold => Heater::from_bool(control::saturate(g) > 0.5),
            Decision::DeadBand { clamp } => {
                if err > clamp {
                    Heater::On
                } else if err < -clamp {
                    Heater::Off
                } else {
                    Heater::from_bool(g > 0.0)
                }
            }
        }
    }
}

/// Actuator state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Heater {
    #[default]
    Off,
    On,
}

impl Heater {
    #[inline]
    pub fn from_bool(on: bool) -> Self {
        if on { Heater::On } else { Heater::Off }
    }

    #[inline]
    pub fn is_on(self) -> bool {
        self == Heater::On
    }

    /// 1.0 when on, 0.0 when off.
    #[inline]
    pub fn actuation(self) -> f64 {
        if self.is_on() { 1.0 } else { 0.0 }
    }
}

/// Snapshot of one control tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    pub measured: f64,
    pub err: f64,
    pub integral: f64,
    pub derivative: f64,
    pub g: f64,
    pub heater: Heater,
}

/// Stateful controller. Integral and previous error persist for the whole
/// run; the measurement buffer is drained on every tick.
#[derive(Clone, Debug)]
pub struct PidController {
    gains: Gains,
    policy: ControlPolicy,
    period: usize,
    integral: f64,
    prev_err: f64,
    buffer: Vec<f64>,
    heater: Heater,
    measured: f64,
}

impl PidController {
    /// `period` is the number of plant steps between ticks; `initial_measured`
    /// is reported until the first tick.
    pub fn new(gains: Gains, policy: ControlPolicy, period: usize, initial_measured: f64) -> Self {
        Self {
            gains,
            policy,
            period: period.max(1),
            integral: 0.0,
            prev_err: 0.0,
            buffer: Vec::new(),
            heater: Heater::Off,
            measured: initial_measured,
        }
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }

    pub fn heater(&self) -> Heater {
        self.heater
    }

    /// Buffer average used at the last tick.
    pub fn measured(&self) -> f64 {
        self.measured
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }

    pub fn buffered(&self) -> &[f64] {
        &self.buffer
    }

    /// Queue a fused reading for the next tick.
    pub fn record(&mut self, reading: f64) {
        self.buffer.push(reading);
    }

    /// Run one control tick against `reference`.
    ///
    /// An empty buffer (readings rarer than ticks) reuses the last measured
    /// value instead of averaging nothing.
    pub fn tick(&mut self, reference: f64) -> Tick {
        if self.buffer.is_empty() {
            tracing::debug!(held = self.measured, "control tick with no new readings");
        } else {
            self.measured = fusion::mean(&self.buffer);
        }
        let err = reference - self.measured;
        let scale = self.policy.scaling.factor(self.period);
        self.integral += err * scale;
        let derivative = (err - self.prev_err) / scale;
        let g = self.gains.combine(err, self.integral, derivative);
        self.heater = self.policy.decide(err, g);
        self.prev_err = err;
        self.buffer.clear();
        Tick { measured: self.measured, err, integral: self.integral, derivative, g, heater: self.heater }
    }
}
